use std::future::Future;
use std::sync::Arc;

use gsm_activity::{Activity, ActivityError, ChannelAccount};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::TurnCredentials;
use crate::connector::{ConversationClient, ConversationEndpoint, ResourceResponse};
use crate::error::{BridgeError, TransportError};

/// Conversation-operations proxy for one turn.
///
/// Bound to the service URL and conversation of the activity the turn was built from. Missing
/// fields are reported when an operation needs them, not when the proxy is created. Every call
/// observes the turn's cancellation token.
pub struct ConversationOperations {
    service_url: Option<String>,
    conversation_id: Option<String>,
    client: Arc<dyn ConversationClient>,
    credentials: Arc<TurnCredentials>,
    cancel: CancellationToken,
}

impl ConversationOperations {
    pub fn for_activity(
        activity: &Activity,
        client: Arc<dyn ConversationClient>,
        credentials: Arc<TurnCredentials>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service_url: activity.service_url.clone(),
            conversation_id: activity.conversation_id().map(str::to_string),
            client,
            credentials,
            cancel,
        }
    }

    pub fn endpoint(&self) -> Result<ConversationEndpoint, ActivityError> {
        let service_url = self
            .service_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ActivityError::missing("serviceUrl"))?;
        let conversation_id = self
            .conversation_id
            .as_deref()
            .ok_or(ActivityError::missing("conversation.id"))?;
        Ok(ConversationEndpoint::new(service_url, conversation_id))
    }

    pub fn credentials(&self) -> &Arc<TurnCredentials> {
        &self.credentials
    }

    /// Posts `activity`, as a threaded reply when it carries a `replyToId`.
    pub async fn send_activity(&self, activity: &Activity) -> Result<ResourceResponse, BridgeError> {
        let endpoint = self.endpoint()?;
        let token = self.token().await?;
        let response = match activity.str_property("replyToId").filter(|id| !id.is_empty()) {
            Some(reply_to_id) => {
                self.guarded(
                    "reply_to_activity",
                    self.client
                        .reply_to_activity(&endpoint, reply_to_id, activity, &token),
                )
                .await?
            }
            None => {
                self.guarded(
                    "send_to_conversation",
                    self.client.send_to_conversation(&endpoint, activity, &token),
                )
                .await?
            }
        };
        debug!(conversation = %endpoint.conversation_id, id = %response.id, "activity sent");
        Ok(response)
    }

    /// Replaces a previously sent activity; `activity.id` names the target.
    pub async fn update_activity(
        &self,
        activity: &Activity,
    ) -> Result<ResourceResponse, BridgeError> {
        let activity_id = activity.require_id()?;
        let endpoint = self.endpoint()?;
        let token = self.token().await?;
        Ok(self
            .guarded(
                "update_activity",
                self.client
                    .update_activity(&endpoint, activity_id, activity, &token),
            )
            .await?)
    }

    pub async fn delete_activity(&self, activity_id: &str) -> Result<(), BridgeError> {
        if activity_id.is_empty() {
            return Err(ActivityError::missing("id").into());
        }
        let endpoint = self.endpoint()?;
        let token = self.token().await?;
        Ok(self
            .guarded(
                "delete_activity",
                self.client.delete_activity(&endpoint, activity_id, &token),
            )
            .await?)
    }

    pub async fn members(&self) -> Result<Vec<ChannelAccount>, BridgeError> {
        let endpoint = self.endpoint()?;
        let token = self.token().await?;
        Ok(self
            .guarded(
                "conversation_members",
                self.client.conversation_members(&endpoint, &token),
            )
            .await?)
    }

    async fn token(&self) -> Result<String, TransportError> {
        self.guarded("token", self.credentials.token()).await
    }

    async fn guarded<T, F>(&self, operation: &'static str, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled { operation }),
            result = call => result,
        }
    }
}

impl std::fmt::Debug for ConversationOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOperations")
            .field("service_url", &self.service_url)
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}
