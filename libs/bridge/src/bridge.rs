use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use gsm_activity::{
    Activity, ActivityError, ActivityKind, ActivityTypeRegistry, ConversationReference,
    TypedActivity,
};
use gsm_telemetry::{TurnLabels, record_turn, start_turn_span};
use http::{HeaderMap, StatusCode, header};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::auth::{AgenticIdentity, TokenProvider, TurnCredentials};
use crate::config::BridgeConfig;
use crate::connector::ConversationClient;
use crate::context::TurnContext;
use crate::error::{BridgeError, HandlerError};
use crate::middleware::{LegacyMiddleware, LegacyMiddlewareAdapter, Middleware, Next, TurnHandler};
use crate::operations::ConversationOperations;
use crate::state::{BOT_APP_ID_KEY, CONVERSATION_OPERATIONS_KEY, TURN_CREDENTIALS_KEY};

/// Callback observing handler failures that carry their originating activity.
#[async_trait]
pub trait TurnErrorHandler: Send + Sync {
    async fn on_turn_error(
        &self,
        ctx: &mut TurnContext,
        error: &HandlerError,
    ) -> anyhow::Result<()>;
}

/// Raw inbound request as the hosting transport received it.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }
}

/// What the transport should answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl TurnResponse {
    fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }
}

#[derive(Clone, Copy)]
enum TurnKind {
    Reactive,
    Proactive,
}

impl TurnKind {
    fn as_str(self) -> &'static str {
        match self {
            TurnKind::Reactive => "reactive",
            TurnKind::Proactive => "proactive",
        }
    }
}

/// Runs reactive and proactive turns through one canonical pipeline.
///
/// Each turn gets its own [`TurnContext`] with freshly built credentials and a conversation
/// operations proxy; nothing turn-scoped is kept on the bridge.
pub struct CompatibilityBridge {
    config: BridgeConfig,
    registry: Arc<ActivityTypeRegistry>,
    middleware: Vec<Arc<dyn Middleware>>,
    on_turn_error: Option<Arc<dyn TurnErrorHandler>>,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn ConversationClient>,
}

pub struct CompatibilityBridgeBuilder {
    config: BridgeConfig,
    registry: Option<Arc<ActivityTypeRegistry>>,
    middleware: Vec<Arc<dyn Middleware>>,
    on_turn_error: Option<Arc<dyn TurnErrorHandler>>,
    tokens: Arc<dyn TokenProvider>,
    connector: Arc<dyn ConversationClient>,
}

impl CompatibilityBridgeBuilder {
    /// Uses `registry` instead of [`ActivityTypeRegistry::with_defaults`].
    pub fn registry(mut self, registry: Arc<ActivityTypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Appends modern middleware; middleware runs in the order it was added.
    pub fn use_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends legacy middleware, adapted into the same ordered chain.
    pub fn use_legacy_middleware(mut self, middleware: impl LegacyMiddleware + 'static) -> Self {
        self.middleware
            .push(Arc::new(LegacyMiddlewareAdapter::new(middleware)));
        self
    }

    pub fn on_turn_error(mut self, handler: impl TurnErrorHandler + 'static) -> Self {
        self.on_turn_error = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> CompatibilityBridge {
        CompatibilityBridge {
            config: self.config,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(ActivityTypeRegistry::with_defaults())),
            middleware: self.middleware,
            on_turn_error: self.on_turn_error,
            tokens: self.tokens,
            connector: self.connector,
        }
    }
}

impl CompatibilityBridge {
    pub fn builder(
        config: BridgeConfig,
        tokens: Arc<dyn TokenProvider>,
        connector: Arc<dyn ConversationClient>,
    ) -> CompatibilityBridgeBuilder {
        CompatibilityBridgeBuilder {
            config,
            registry: None,
            middleware: Vec::new(),
            on_turn_error: None,
            tokens,
            connector,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ActivityTypeRegistry {
        &self.registry
    }

    /// Processes one inbound request.
    ///
    /// Cancelling `cancel` aborts the pipeline with [`BridgeError::Cancelled`] and every connector
    /// call in flight. Non-invoke turns answer `200`; invoke turns answer with the handler's
    /// invoke response, or `501` when no handler produced one.
    pub async fn process(
        &self,
        request: InboundRequest,
        handler: &dyn TurnHandler,
        cancel: CancellationToken,
    ) -> Result<TurnResponse, BridgeError> {
        check_content_type(&request.headers)?;
        let activity = Activity::from_slice(&request.body)
            .map_err(|err| BridgeError::InvalidRequest(err.to_string()))?;
        let app_id = self.config.app_id.clone();
        let ctx = self.run_turn(TurnKind::Reactive, app_id, activity, handler, cancel).await?;
        Ok(turn_response(ctx))
    }

    /// Runs a bot-initiated turn from a stored conversation reference.
    ///
    /// The turn starts from the reference's continuation activity and receives the same
    /// collaborators as a reactive turn, acting as `bot_id`. Returns the ids of the activities
    /// sent during the turn.
    pub async fn continue_conversation(
        &self,
        bot_id: &str,
        reference: &ConversationReference,
        handler: &dyn TurnHandler,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, BridgeError> {
        if bot_id.trim().is_empty() {
            return Err(ActivityError::missing("botId").into());
        }
        let activity = reference.continuation_activity();
        let ctx = self
            .run_turn(
                TurnKind::Proactive,
                bot_id.to_string(),
                activity,
                handler,
                cancel,
            )
            .await?;
        Ok(ctx.sent_activity_ids().to_vec())
    }

    async fn run_turn(
        &self,
        kind: TurnKind,
        app_id: String,
        activity: Activity,
        handler: &dyn TurnHandler,
        cancel: CancellationToken,
    ) -> Result<TurnContext, BridgeError> {
        let span = start_turn_span(&turn_labels(kind, &activity));
        async move {
            let typed = self.registry.resolve(activity)?;
            let mut ctx = self.turn_context(&app_id, typed, cancel.clone());
            debug!("turn started");

            match self.run_pipeline(&mut ctx, handler).await {
                Ok(()) => {
                    record_turn(kind.as_str(), "ok");
                    Ok(ctx)
                }
                Err(BridgeError::Handler(err)) => {
                    let sent = ctx.sent_activity_ids().to_vec();
                    drop(ctx);
                    let recovered = self.recover(&app_id, err, sent, cancel).await;
                    let outcome = if recovered.is_ok() { "recovered" } else { "error" };
                    record_turn(kind.as_str(), outcome);
                    recovered
                }
                Err(BridgeError::Cancelled) => {
                    info!("turn cancelled by transport");
                    record_turn(kind.as_str(), "cancelled");
                    Err(BridgeError::Cancelled)
                }
                Err(err) => {
                    warn!(error = %err, "turn failed");
                    record_turn(kind.as_str(), "error");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(
        &self,
        ctx: &mut TurnContext,
        handler: &dyn TurnHandler,
    ) -> Result<(), BridgeError> {
        let cancel = ctx.cancellation().clone();
        let next = Next::new(&self.middleware, handler);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            result = next.run(ctx) => result.map_err(HandlerError::into_bridge_error),
        }
    }

    /// Hands a failed turn to the error callback, on a context rebuilt from the failing activity.
    async fn recover(
        &self,
        app_id: &str,
        err: HandlerError,
        sent: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<TurnContext, BridgeError> {
        let failed_activity = err.activity().cloned();
        let (Some(callback), Some(activity)) = (self.on_turn_error.as_ref(), failed_activity) else {
            warn!(error = %err, "turn failed");
            return Err(err.into());
        };
        warn!(error = %err, "turn failed; running error callback");

        let typed = self.registry.resolve(activity)?;
        let mut ctx = self.turn_context(app_id, typed, cancel.clone());
        ctx.carry_sent(sent);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BridgeError::Cancelled),
            result = callback.on_turn_error(&mut ctx, &err) => {
                result.map_err(|callback_err| {
                    HandlerError::from(callback_err).into_bridge_error()
                })?;
            }
        }
        Ok(ctx)
    }

    fn turn_context(
        &self,
        app_id: &str,
        activity: TypedActivity,
        cancel: CancellationToken,
    ) -> TurnContext {
        let agentic = activity
            .activity()
            .recipient
            .as_ref()
            .and_then(AgenticIdentity::from_account);
        let credentials = Arc::new(TurnCredentials::new(
            app_id,
            &self.config,
            agentic,
            Arc::clone(&self.tokens),
        ));
        let operations = ConversationOperations::for_activity(
            activity.activity(),
            Arc::clone(&self.connector),
            Arc::clone(&credentials),
            cancel.clone(),
        );

        let mut ctx = TurnContext::new(activity, cancel);
        let state = ctx.state_mut();
        state.insert(BOT_APP_ID_KEY, app_id.to_string());
        state.insert_arc(TURN_CREDENTIALS_KEY, credentials);
        state.insert(CONVERSATION_OPERATIONS_KEY, operations);
        ctx
    }
}

fn check_content_type(headers: &HeaderMap) -> Result<(), BridgeError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = value.to_str().unwrap_or_default();
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(BridgeError::InvalidRequest(format!(
            "unsupported content type `{content_type}`"
        )))
    }
}

fn turn_labels(kind: TurnKind, activity: &Activity) -> TurnLabels {
    let mut labels = TurnLabels::new(kind.as_str());
    labels.channel = activity.channel_id.clone();
    labels.conversation = activity.conversation_id().map(str::to_string);
    labels.activity_type = activity.discriminator().map(str::to_string);
    labels.activity_id = activity.id.clone();
    labels
}

fn turn_response(mut ctx: TurnContext) -> TurnResponse {
    if ctx.activity().kind() != ActivityKind::Invoke {
        return TurnResponse::ok();
    }
    match ctx.take_invoke_response() {
        Some(response) => TurnResponse {
            status: StatusCode::from_u16(response.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: response.body,
        },
        None => TurnResponse {
            status: StatusCode::NOT_IMPLEMENTED,
            body: None,
        },
    }
}
