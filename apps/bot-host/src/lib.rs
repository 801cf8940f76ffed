//! HTTP host for a Greentic bot.
//!
//! Wires the sample bot's routes, middleware, and error callback into a
//! [`CompatibilityBridge`] and serves it over axum.
pub mod bot;
pub mod config;
pub mod http;
pub mod security;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use gsm_bridge::{
    BridgeConfig, ClientCredentialsTokenProvider, CompatibilityBridge, ConnectorClient,
    ConversationClient, TokenProvider,
};

use crate::bot::{ApologizeOnError, TurnAudit, bot_router};
use crate::config::BotHostConfig;
use crate::http::AppState;
use crate::security::IngressAuth;
use crate::store::{CaptureReferences, ConversationReferenceStore};

/// Builds the shared state around the given outbound collaborators.
pub fn build_state(
    bridge_config: BridgeConfig,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn ConversationClient>,
) -> Result<AppState> {
    let store = Arc::new(ConversationReferenceStore::new());
    let bot = bot_router(Arc::clone(&store))?;
    let app_id = bridge_config.app_id.clone();
    let bridge = CompatibilityBridge::builder(bridge_config, tokens, connector)
        .use_middleware(CaptureReferences::new(Arc::clone(&store)))
        .use_legacy_middleware(TurnAudit)
        .on_turn_error(ApologizeOnError)
        .build();
    Ok(AppState {
        bridge: Arc::new(bridge),
        bot: Arc::new(bot),
        store,
        app_id,
    })
}

/// Builds the axum app with the production token provider and connector client.
pub fn build_app(config: &BotHostConfig) -> Result<axum::Router> {
    let tokens = ClientCredentialsTokenProvider::new(
        config.auth_base.clone(),
        config.tenant_id.clone(),
        config.app_id.clone(),
        config.app_password.clone(),
    )?;
    let connector = ConnectorClient::new()?;
    let state = build_state(config.bridge_config(), Arc::new(tokens), Arc::new(connector))?;
    Ok(http::build_router(
        state,
        IngressAuth {
            bearer: config.ingress_bearer.clone(),
        },
    ))
}
