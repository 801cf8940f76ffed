use async_trait::async_trait;
use gsm_activity::{Activity, ChannelAccount};
use gsm_telemetry::record_connector_error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TransportError;

/// Service URL and conversation a connector call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEndpoint {
    pub service_url: String,
    pub conversation_id: String,
}

impl ConversationEndpoint {
    pub fn new(service_url: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            conversation_id: conversation_id.into(),
        }
    }

    fn is_mock(&self) -> bool {
        self.service_url.starts_with("mock://")
    }

    /// `{serviceUrl}/v3/conversations/{conversationId}` with the id percent-encoded.
    pub fn conversation_url(&self) -> String {
        format!(
            "{}/v3/conversations/{}",
            self.service_url.trim_end_matches('/'),
            urlencoding::encode(&self.conversation_id)
        )
    }

    pub fn activities_url(&self) -> String {
        format!("{}/activities", self.conversation_url())
    }

    pub fn activity_url(&self, activity_id: &str) -> String {
        format!(
            "{}/{}",
            self.activities_url(),
            urlencoding::encode(activity_id)
        )
    }

    pub fn members_url(&self) -> String {
        format!("{}/members", self.conversation_url())
    }
}

/// Connector answer to a send or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    #[serde(default)]
    pub id: String,
}

/// Activity operations against a conversation.
#[async_trait]
pub trait ConversationClient: Send + Sync {
    async fn send_to_conversation(
        &self,
        endpoint: &ConversationEndpoint,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError>;

    async fn reply_to_activity(
        &self,
        endpoint: &ConversationEndpoint,
        reply_to_id: &str,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError>;

    async fn update_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError>;

    async fn delete_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        token: &str,
    ) -> Result<(), TransportError>;

    async fn conversation_members(
        &self,
        endpoint: &ConversationEndpoint,
        token: &str,
    ) -> Result<Vec<ChannelAccount>, TransportError>;
}

/// Bot Connector REST client (`/v3/conversations`).
///
/// Service URLs starting with `mock://` are answered locally, which keeps local runs and
/// conformance checks off the network.
#[derive(Clone)]
pub struct ConnectorClient {
    client: reqwest::Client,
}

impl ConnectorClient {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent("gsm-bot-connector/0.4")
            .build()
            .map_err(|source| TransportError::Http {
                operation: "connector_client",
                source,
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send_json(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| {
                record_connector_error(operation);
                TransportError::Http { operation, source }
            })?;
        read_response(operation, response).await
    }
}

async fn read_response<T>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, TransportError>
where
    T: DeserializeOwned + Default,
{
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| TransportError::Http { operation, source })?;

    if !status.is_success() {
        record_connector_error(operation);
        warn!(operation, status = status.as_u16(), "connector call failed");
        return Err(TransportError::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&body).map_err(|source| TransportError::Decode { operation, source })
}

fn mock_response(activity: Option<&Activity>) -> ResourceResponse {
    ResourceResponse {
        id: activity
            .and_then(|a| a.id.clone())
            .unwrap_or_else(|| "mock-activity".into()),
    }
}

#[async_trait]
impl ConversationClient for ConnectorClient {
    async fn send_to_conversation(
        &self,
        endpoint: &ConversationEndpoint,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        if endpoint.is_mock() {
            return Ok(mock_response(Some(activity)));
        }
        let request = self.client.post(endpoint.activities_url()).json(activity);
        self.send_json("send_to_conversation", request, token).await
    }

    async fn reply_to_activity(
        &self,
        endpoint: &ConversationEndpoint,
        reply_to_id: &str,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        if endpoint.is_mock() {
            return Ok(mock_response(Some(activity)));
        }
        let request = self
            .client
            .post(endpoint.activity_url(reply_to_id))
            .json(activity);
        self.send_json("reply_to_activity", request, token).await
    }

    async fn update_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        if endpoint.is_mock() {
            return Ok(mock_response(Some(activity)));
        }
        let request = self
            .client
            .put(endpoint.activity_url(activity_id))
            .json(activity);
        self.send_json("update_activity", request, token).await
    }

    async fn delete_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        token: &str,
    ) -> Result<(), TransportError> {
        if endpoint.is_mock() {
            return Ok(());
        }
        let request = self.client.delete(endpoint.activity_url(activity_id));
        self.send_json("delete_activity", request, token)
            .await
            .map(|_| ())
    }

    async fn conversation_members(
        &self,
        endpoint: &ConversationEndpoint,
        token: &str,
    ) -> Result<Vec<ChannelAccount>, TransportError> {
        if endpoint.is_mock() {
            return Ok(Vec::new());
        }
        let operation = "conversation_members";
        let response = self
            .client
            .get(endpoint.members_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| {
                record_connector_error(operation);
                TransportError::Http { operation, source }
            })?;
        read_response(operation, response).await
    }
}
