use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use gsm_bridge::{BridgeError, CompatibilityBridge, InboundRequest, TurnContext, TurnResponse};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bot::ProactiveText;
use crate::security::{IngressAuth, verify_bearer};
use crate::store::ConversationReferenceStore;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<CompatibilityBridge>,
    pub bot: Arc<gsm_router::Router<TurnContext>>,
    pub store: Arc<ConversationReferenceStore>,
    /// Identity proactive turns act as.
    pub app_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub conversation_id: String,
    pub activity_ids: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct ApiError {
    error: String,
}

#[derive(Serialize, Debug)]
pub struct RouteListing {
    name: String,
    kind: String,
}

pub fn build_router(state: AppState, auth: IngressAuth) -> Router {
    let api = Router::new()
        .route("/api/messages", post(messages))
        .route("/api/notify/{conversation_id}", post(notify))
        .route("/api/routes", get(routes))
        .layer(middleware::from_fn(verify_bearer))
        .layer(Extension(auth));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(api)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn messages(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    // Dropping the request future (client gone) cancels the turn.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let request = InboundRequest::new(headers, body);
    match state
        .bridge
        .process(request, &*state.bot, cancel)
        .await
    {
        Ok(response) => turn_response(response),
        Err(err) => error_response(err),
    }
}

async fn notify(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<NotifyRequest>,
) -> Response {
    let Some(reference) = state.store.get(&conversation_id) else {
        return api_error(
            StatusCode::NOT_FOUND,
            format!("no conversation reference for `{conversation_id}`"),
        );
    };
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let handler = ProactiveText::new(request.text);
    match state
        .bridge
        .continue_conversation(&state.app_id, &reference, &handler, cancel)
        .await
    {
        Ok(activity_ids) => (
            StatusCode::OK,
            Json(NotifyResponse {
                conversation_id,
                activity_ids,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn routes(State(state): State<AppState>) -> Json<Vec<RouteListing>> {
    Json(
        state
            .bot
            .snapshot()
            .into_iter()
            .map(|info| RouteListing {
                name: info.name,
                kind: info.kind.to_string(),
            })
            .collect(),
    )
}

fn turn_response(response: TurnResponse) -> Response {
    match response.body {
        Some(body) => (response.status, Json(body)).into_response(),
        None => response.status.into_response(),
    }
}

fn error_response(err: BridgeError) -> Response {
    let status = match &err {
        BridgeError::InvalidRequest(_) | BridgeError::Argument(_) => StatusCode::BAD_REQUEST,
        BridgeError::Transport(_) => StatusCode::BAD_GATEWAY,
        BridgeError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Handler(_) | BridgeError::MissingService { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    warn!(status = status.as_u16(), error = %err, "turn failed");
    api_error(status, err.to_string())
}

fn api_error(status: StatusCode, error: String) -> Response {
    (status, Json(ApiError { error })).into_response()
}
