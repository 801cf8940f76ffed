use std::sync::Arc;

use gsm_activity::{Activity, ActivityKind, ChannelAccount, InvokeResponse, TypedActivity};
use gsm_router::RoutedTurn;
use tokio_util::sync::CancellationToken;

use crate::auth::TurnCredentials;
use crate::connector::ResourceResponse;
use crate::error::{BridgeError, HandlerError};
use crate::operations::ConversationOperations;
use crate::state::{BOT_APP_ID_KEY, CONVERSATION_OPERATIONS_KEY, TURN_CREDENTIALS_KEY, TurnState};

/// Modern turn context: the canonical activity plus everything scoped to this one turn.
#[derive(Debug)]
pub struct TurnContext {
    activity: TypedActivity,
    state: TurnState,
    cancel: CancellationToken,
    invoke_response: Option<InvokeResponse>,
    sent: Vec<String>,
    responded: bool,
    resolved_type: Option<String>,
}

impl TurnContext {
    pub fn new(activity: TypedActivity, cancel: CancellationToken) -> Self {
        let resolved_type = activity.activity().discriminator().map(str::to_string);
        Self {
            activity,
            resolved_type,
            state: TurnState::new(),
            cancel,
            invoke_response: None,
            sent: Vec::new(),
            responded: false,
        }
    }

    pub fn activity(&self) -> &TypedActivity {
        &self.activity
    }

    /// Mutable access to the canonical activity.
    ///
    /// The typed variant was resolved from `type` once; rewriting `type` here does not
    /// re-resolve it, and the pipeline refuses to continue past such a change.
    pub fn activity_mut(&mut self) -> &mut TypedActivity {
        &mut self.activity
    }

    /// Fails when `type` no longer matches the discriminator the typed variant was resolved from.
    pub(crate) fn ensure_resolved_type(&self) -> Result<(), HandlerError> {
        let current = self.activity.activity().discriminator();
        if current == self.resolved_type.as_deref() {
            return Ok(());
        }
        Err(HandlerError::new(anyhow::anyhow!(
            "activity type changed from `{}` to `{}` after resolution",
            self.resolved_type.as_deref().unwrap_or(""),
            current.unwrap_or("")
        )))
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TurnState {
        &mut self.state
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn bot_app_id(&self) -> Option<Arc<String>> {
        self.state.get(BOT_APP_ID_KEY)
    }

    pub fn credentials(&self) -> Result<Arc<TurnCredentials>, BridgeError> {
        self.state
            .get(TURN_CREDENTIALS_KEY)
            .ok_or(BridgeError::MissingService {
                key: TURN_CREDENTIALS_KEY,
            })
    }

    pub fn conversation_operations(&self) -> Result<Arc<ConversationOperations>, BridgeError> {
        self.state
            .get(CONVERSATION_OPERATIONS_KEY)
            .ok_or(BridgeError::MissingService {
                key: CONVERSATION_OPERATIONS_KEY,
            })
    }

    /// Sends `activity` into this turn's conversation.
    ///
    /// An activity without a conversation is addressed from the turn's activity first; replies to
    /// inbound messages are threaded under them.
    pub async fn send_activity(
        &mut self,
        mut activity: Activity,
    ) -> Result<ResourceResponse, BridgeError> {
        if activity.conversation.is_none() {
            let inbound = self.activity.activity();
            activity.apply_conversation_reference(&inbound.conversation_reference(), false);
            if inbound.kind() != ActivityKind::Message {
                activity.remove_property("replyToId");
            }
        }
        let operations = self.conversation_operations()?;
        let response = operations.send_activity(&activity).await?;
        self.sent.push(response.id.clone());
        self.responded = true;
        Ok(response)
    }

    pub async fn send_text(
        &mut self,
        text: impl Into<String>,
    ) -> Result<ResourceResponse, BridgeError> {
        let mut activity = Activity::of_kind(ActivityKind::Message);
        activity.set_str_property("text", text);
        self.send_activity(activity).await
    }

    pub async fn update_activity(
        &mut self,
        mut activity: Activity,
    ) -> Result<ResourceResponse, BridgeError> {
        if activity.conversation.is_none() {
            activity.conversation = self.activity.activity().conversation.clone();
        }
        self.conversation_operations()?
            .update_activity(&activity)
            .await
    }

    pub async fn delete_activity(&mut self, activity_id: &str) -> Result<(), BridgeError> {
        self.conversation_operations()?
            .delete_activity(activity_id)
            .await
    }

    pub async fn members(&self) -> Result<Vec<ChannelAccount>, BridgeError> {
        self.conversation_operations()?.members().await
    }

    pub fn set_invoke_response(&mut self, response: InvokeResponse) {
        self.invoke_response = Some(response);
        self.responded = true;
    }

    pub fn invoke_response(&self) -> Option<&InvokeResponse> {
        self.invoke_response.as_ref()
    }

    pub fn take_invoke_response(&mut self) -> Option<InvokeResponse> {
        self.invoke_response.take()
    }

    /// Ids the connector returned for activities sent during this turn.
    pub fn sent_activity_ids(&self) -> &[String] {
        &self.sent
    }

    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Seeds the ids sent by an earlier, failed attempt at this turn.
    pub(crate) fn carry_sent(&mut self, earlier: Vec<String>) {
        if !earlier.is_empty() {
            self.responded = true;
        }
        let later = std::mem::replace(&mut self.sent, earlier);
        self.sent.extend(later);
    }

    /// Wraps `err` as a handler failure that carries this turn's activity.
    pub fn fail(&self, err: impl Into<anyhow::Error>) -> HandlerError {
        HandlerError::new(err).with_activity(self.activity.activity().clone())
    }

    /// Legacy-shaped view over this same turn.
    pub fn legacy(&mut self) -> LegacyTurnContext<'_> {
        LegacyTurnContext { turn: self }
    }
}

impl RoutedTurn for TurnContext {
    fn activity(&self) -> &TypedActivity {
        &self.activity
    }
}

/// Legacy turn context.
///
/// Exposes the untyped envelope and the turn state as `services`. It borrows the modern context
/// and owns nothing, so both shapes always observe the same activity and state.
#[derive(Debug)]
pub struct LegacyTurnContext<'a> {
    turn: &'a mut TurnContext,
}

impl<'a> LegacyTurnContext<'a> {
    pub fn new(turn: &'a mut TurnContext) -> Self {
        Self { turn }
    }

    pub fn activity(&self) -> &Activity {
        self.turn.activity.activity()
    }

    /// The untyped envelope. Writes to `type` stop the pipeline at the next continuation.
    pub fn activity_mut(&mut self) -> &mut Activity {
        self.turn.activity.activity_mut()
    }

    pub fn services(&self) -> &TurnState {
        &self.turn.state
    }

    pub fn services_mut(&mut self) -> &mut TurnState {
        &mut self.turn.state
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.turn.cancel
    }

    /// Sends `activities` in order, stopping at the first failure.
    pub async fn send_activities(
        &mut self,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, BridgeError> {
        let mut responses = Vec::with_capacity(activities.len());
        for activity in activities {
            responses.push(self.turn.send_activity(activity).await?);
        }
        Ok(responses)
    }

    pub async fn send_text(
        &mut self,
        text: impl Into<String>,
    ) -> Result<ResourceResponse, BridgeError> {
        self.turn.send_text(text).await
    }

    pub fn responded(&self) -> bool {
        self.turn.responded
    }

    /// The modern context this view wraps.
    pub fn turn(&mut self) -> &mut TurnContext {
        &mut *self.turn
    }
}
