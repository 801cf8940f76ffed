//! The sample bot served by the host: a route table plus the middleware and error callback
//! wired around it.

use std::sync::Arc;

use async_trait::async_trait;
use gsm_activity::{ActivityKind, InvokeResponse};
use gsm_bridge::{
    HandlerError, LegacyMiddleware, LegacyNext, LegacyTurnContext, TurnContext, TurnErrorHandler,
    TurnHandler,
};
use gsm_router::{ConfigurationError, InstallAction, RouteHandler, Router, Route};
use serde_json::json;
use tracing::{info, warn};

use crate::store::ConversationReferenceStore;

pub const HELP_TEXT: &str = "Send any text and I will echo it back. Say `help` to see this again.";
pub const WELCOME_TEXT: &str = "Hi! I'm listening in this conversation.";
pub const INSTALLED_TEXT: &str = "Thanks for adding me.";
pub const APOLOGY_TEXT: &str = "Sorry, something went wrong while handling that.";

/// Builds the route table. Registration order is match order.
pub fn bot_router(
    store: Arc<ConversationReferenceStore>,
) -> Result<Router<TurnContext>, ConfigurationError> {
    let mut router = Router::new();
    router
        .register(Route::message_text(
            "help",
            |text| text.trim().eq_ignore_ascii_case("help"),
            Help,
        ))?
        .register(Route::activity(ActivityKind::Message, Echo))?
        .register(Route::conversation_update("membersAdded", Welcome))?
        .register(Route::installation_update(InstallAction::Add, Installed))?
        .register(Route::installation_update(
            InstallAction::Remove,
            Uninstalled { store },
        ))?
        .register(Route::invoke("adaptiveCard/action", CardAction))?;
    Ok(router)
}

struct Help;

#[async_trait]
impl RouteHandler<TurnContext> for Help {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        ctx.send_text(HELP_TEXT).await?;
        Ok(())
    }
}

struct Echo;

#[async_trait]
impl RouteHandler<TurnContext> for Echo {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        let text = ctx
            .activity()
            .as_message()
            .and_then(|message| message.text())
            .unwrap_or_default()
            .trim()
            .to_string();
        if text.is_empty() {
            return Ok(());
        }
        ctx.send_text(format!("echo: {text}")).await?;
        Ok(())
    }
}

struct Welcome;

#[async_trait]
impl RouteHandler<TurnContext> for Welcome {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        let Some(update) = ctx.activity().as_conversation_update() else {
            return Ok(());
        };
        let bot_id = update
            .recipient
            .as_ref()
            .and_then(|bot| bot.id())
            .map(str::to_string);
        let newcomers: Vec<String> = update
            .members_added()?
            .into_iter()
            .filter(|member| bot_id.is_none() || member.id() != bot_id.as_deref())
            .filter_map(|member| member.name.or(member.id))
            .collect();
        if newcomers.is_empty() {
            return Ok(());
        }
        ctx.send_text(format!("{WELCOME_TEXT} Welcome, {}.", newcomers.join(", ")))
            .await?;
        Ok(())
    }
}

struct Installed;

#[async_trait]
impl RouteHandler<TurnContext> for Installed {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        ctx.send_text(INSTALLED_TEXT).await?;
        Ok(())
    }
}

struct Uninstalled {
    store: Arc<ConversationReferenceStore>,
}

#[async_trait]
impl RouteHandler<TurnContext> for Uninstalled {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        if let Some(conversation) = ctx.activity().activity().conversation_id() {
            self.store.remove(conversation);
            info!(conversation, "bot uninstalled; reference dropped");
        }
        Ok(())
    }
}

struct CardAction;

#[async_trait]
impl RouteHandler<TurnContext> for CardAction {
    async fn handle(&self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        let verb = ctx
            .activity()
            .as_invoke()
            .and_then(|invoke| invoke.value())
            .and_then(|value| value.pointer("/action/verb"))
            .and_then(|verb| verb.as_str())
            .unwrap_or("unknown")
            .to_string();
        ctx.set_invoke_response(InvokeResponse::ok(json!({
            "statusCode": 200,
            "type": "application/vnd.microsoft.activity.message",
            "value": format!("action `{verb}` received"),
        })));
        Ok(())
    }
}

/// Legacy middleware that logs each turn and whether anything was sent back.
pub struct TurnAudit;

#[async_trait]
impl LegacyMiddleware for TurnAudit {
    async fn on_turn(
        &self,
        ctx: &mut LegacyTurnContext<'_>,
        next: LegacyNext<'_>,
    ) -> anyhow::Result<()> {
        let activity_type = ctx.activity().discriminator().unwrap_or("").to_string();
        let result = next.run(ctx).await;
        info!(
            activity_type = %activity_type,
            responded = ctx.responded(),
            ok = result.is_ok(),
            "turn audited"
        );
        result
    }
}

/// Tells the user the turn failed. The failure itself is already logged by the bridge.
pub struct ApologizeOnError;

#[async_trait]
impl TurnErrorHandler for ApologizeOnError {
    async fn on_turn_error(
        &self,
        ctx: &mut TurnContext,
        error: &HandlerError,
    ) -> anyhow::Result<()> {
        if ctx.activity().kind() == ActivityKind::Invoke {
            ctx.set_invoke_response(InvokeResponse::new(500, None));
            return Ok(());
        }
        if let Err(err) = ctx.send_text(APOLOGY_TEXT).await {
            warn!(error = %err, original = %error, "could not deliver apology");
        }
        Ok(())
    }
}

/// Proactive handler that sends one text message into the continued conversation.
pub struct ProactiveText {
    text: String,
}

impl ProactiveText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TurnHandler for ProactiveText {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        if let Err(err) = ctx.send_text(self.text.clone()).await {
            return Err(ctx.fail(err));
        }
        Ok(())
    }
}
