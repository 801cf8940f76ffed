use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use gsm_bridge::{BridgeConfig, DEFAULT_CONNECTOR_SCOPE};

const DEFAULT_BIND: &str = "0.0.0.0:3978";
const DEFAULT_AUTH_BASE: &str = "https://login.microsoftonline.com";
const DEFAULT_TENANT: &str = "botframework.com";

#[derive(Debug, Clone)]
pub struct BotHostConfig {
    pub addr: SocketAddr,
    pub app_id: String,
    pub app_password: String,
    pub tenant_id: String,
    pub auth_base: String,
    pub scope: String,
    /// Shared bearer required on `/api/*` when set.
    pub ingress_bearer: Option<String>,
}

impl BotHostConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind = get("BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid BIND address `{bind}`"))?;
        let Some(app_id) = get("BOT_APP_ID") else {
            bail!("BOT_APP_ID must be set");
        };
        let auth_base = get("BOT_AUTH_BASE").unwrap_or_else(|| DEFAULT_AUTH_BASE.into());
        let app_password = get("BOT_APP_PASSWORD").unwrap_or_default();
        if app_password.is_empty() && !auth_base.starts_with("mock://") {
            bail!("BOT_APP_PASSWORD must be set unless BOT_AUTH_BASE is a mock:// authority");
        }

        Ok(Self {
            addr,
            app_id,
            app_password,
            tenant_id: get("BOT_TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT.into()),
            auth_base,
            scope: get("BOT_TOKEN_SCOPE").unwrap_or_else(|| DEFAULT_CONNECTOR_SCOPE.into()),
            ingress_bearer: get("INGRESS_BEARER"),
        })
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::new(self.app_id.clone()).with_scope(self.scope.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_mock_authority() {
        let config = BotHostConfig::from_lookup(lookup(&[
            ("BOT_APP_ID", "app-1"),
            ("BOT_AUTH_BASE", "mock://auth"),
        ]))
        .unwrap();
        assert_eq!(config.addr, DEFAULT_BIND.parse().unwrap());
        assert_eq!(config.tenant_id, DEFAULT_TENANT);
        assert_eq!(config.scope, DEFAULT_CONNECTOR_SCOPE);
        assert!(config.ingress_bearer.is_none());
        assert_eq!(config.bridge_config().app_id, "app-1");
    }

    #[test]
    fn app_id_is_required() {
        let err = BotHostConfig::from_lookup(lookup(&[("BOT_APP_ID", "  ")])).unwrap_err();
        assert!(err.to_string().contains("BOT_APP_ID"));
    }

    #[test]
    fn password_is_required_for_real_authorities() {
        let err = BotHostConfig::from_lookup(lookup(&[("BOT_APP_ID", "app-1")])).unwrap_err();
        assert!(err.to_string().contains("BOT_APP_PASSWORD"));
    }

    #[test]
    fn bad_bind_is_reported() {
        let err = BotHostConfig::from_lookup(lookup(&[
            ("BOT_APP_ID", "app-1"),
            ("BOT_AUTH_BASE", "mock://auth"),
            ("BIND", "nowhere"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("invalid BIND"));
    }
}
