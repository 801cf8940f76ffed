//! In-memory collaborators for exercising turns without a connector.

use std::sync::Mutex;

use async_trait::async_trait;
use gsm_activity::{Activity, ChannelAccount};

use crate::auth::{TokenProvider, TokenRequest};
use crate::connector::{ConversationClient, ConversationEndpoint, ResourceResponse};
use crate::error::TransportError;

/// One call observed by [`RecordingConversationClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Send {
        endpoint: ConversationEndpoint,
        activity: Activity,
        token: String,
    },
    Reply {
        endpoint: ConversationEndpoint,
        reply_to_id: String,
        activity: Activity,
        token: String,
    },
    Update {
        endpoint: ConversationEndpoint,
        activity_id: String,
        activity: Activity,
    },
    Delete {
        endpoint: ConversationEndpoint,
        activity_id: String,
    },
    Members {
        endpoint: ConversationEndpoint,
    },
}

impl RecordedCall {
    pub fn endpoint(&self) -> &ConversationEndpoint {
        match self {
            RecordedCall::Send { endpoint, .. }
            | RecordedCall::Reply { endpoint, .. }
            | RecordedCall::Update { endpoint, .. }
            | RecordedCall::Delete { endpoint, .. }
            | RecordedCall::Members { endpoint } => endpoint,
        }
    }

    pub fn activity(&self) -> Option<&Activity> {
        match self {
            RecordedCall::Send { activity, .. }
            | RecordedCall::Reply { activity, .. }
            | RecordedCall::Update { activity, .. } => Some(activity),
            _ => None,
        }
    }
}

/// Records every connector call and answers with sequential ids (`activity-1`, `activity-2`, …).
#[derive(Debug, Default)]
pub struct RecordingConversationClient {
    calls: Mutex<Vec<RecordedCall>>,
    members: Mutex<Vec<ChannelAccount>>,
    fail_status: Mutex<Option<u16>>,
}

impl RecordingConversationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(self, members: Vec<ChannelAccount>) -> Self {
        *self.members.lock().unwrap() = members;
        self
    }

    /// Makes every later call fail with `status`.
    pub fn fail_with_status(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Activities passed to send or reply calls, in order.
    pub fn sent_activities(&self) -> Vec<Activity> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, RecordedCall::Send { .. } | RecordedCall::Reply { .. }))
            .filter_map(|call| call.activity().cloned())
            .collect()
    }

    fn record(
        &self,
        operation: &'static str,
        call: RecordedCall,
    ) -> Result<ResourceResponse, TransportError> {
        if let Some(status) = *self.fail_status.lock().unwrap() {
            return Err(TransportError::Status {
                operation,
                status,
                body: "injected failure".into(),
            });
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        Ok(ResourceResponse {
            id: format!("activity-{}", calls.len()),
        })
    }
}

#[async_trait]
impl ConversationClient for RecordingConversationClient {
    async fn send_to_conversation(
        &self,
        endpoint: &ConversationEndpoint,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        self.record(
            "send_to_conversation",
            RecordedCall::Send {
                endpoint: endpoint.clone(),
                activity: activity.clone(),
                token: token.to_string(),
            },
        )
    }

    async fn reply_to_activity(
        &self,
        endpoint: &ConversationEndpoint,
        reply_to_id: &str,
        activity: &Activity,
        token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        self.record(
            "reply_to_activity",
            RecordedCall::Reply {
                endpoint: endpoint.clone(),
                reply_to_id: reply_to_id.to_string(),
                activity: activity.clone(),
                token: token.to_string(),
            },
        )
    }

    async fn update_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        activity: &Activity,
        _token: &str,
    ) -> Result<ResourceResponse, TransportError> {
        self.record(
            "update_activity",
            RecordedCall::Update {
                endpoint: endpoint.clone(),
                activity_id: activity_id.to_string(),
                activity: activity.clone(),
            },
        )
    }

    async fn delete_activity(
        &self,
        endpoint: &ConversationEndpoint,
        activity_id: &str,
        _token: &str,
    ) -> Result<(), TransportError> {
        self.record(
            "delete_activity",
            RecordedCall::Delete {
                endpoint: endpoint.clone(),
                activity_id: activity_id.to_string(),
            },
        )
        .map(|_| ())
    }

    async fn conversation_members(
        &self,
        endpoint: &ConversationEndpoint,
        _token: &str,
    ) -> Result<Vec<ChannelAccount>, TransportError> {
        self.record(
            "conversation_members",
            RecordedCall::Members {
                endpoint: endpoint.clone(),
            },
        )?;
        Ok(self.members.lock().unwrap().clone())
    }
}

/// Hands out a fixed token and remembers what was asked for.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: Option<String>,
    requests: Mutex<Vec<TokenRequest>>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every request fails with [`TransportError::Token`].
    pub fn failing() -> Self {
        Self {
            token: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, request: &TokenRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.token
            .clone()
            .ok_or_else(|| TransportError::Token("static provider configured to fail".into()))
    }
}
