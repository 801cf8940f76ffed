#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use gsm_bridge::testkit::{RecordingConversationClient, StaticTokenProvider};
use gsm_bridge::{BridgeConfig, CompatibilityBridge, CompatibilityBridgeBuilder, InboundRequest};
use http::{HeaderMap, HeaderValue, header};
use serde_json::{Value, json};

pub type Trail = Arc<Mutex<Vec<String>>>;

pub struct Harness {
    pub connector: Arc<RecordingConversationClient>,
    pub tokens: Arc<StaticTokenProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            connector: Arc::new(RecordingConversationClient::new()),
            tokens: Arc::new(StaticTokenProvider::new("test-token")),
        }
    }

    pub fn with_tokens(tokens: StaticTokenProvider) -> Self {
        Self {
            connector: Arc::new(RecordingConversationClient::new()),
            tokens: Arc::new(tokens),
        }
    }

    pub fn builder(&self) -> CompatibilityBridgeBuilder {
        CompatibilityBridge::builder(
            BridgeConfig::new("app-123"),
            self.tokens.clone(),
            self.connector.clone(),
        )
    }
}

pub fn trail() -> Trail {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn push(trail: &Trail, entry: &str) {
    trail.lock().unwrap().push(entry.to_string());
}

pub fn entries(trail: &Trail) -> Vec<String> {
    trail.lock().unwrap().clone()
}

pub fn message(text: &str) -> Value {
    json!({
        "type": "message",
        "id": "act-1",
        "channelId": "msteams",
        "serviceUrl": "https://smba.example/amer/",
        "from": { "id": "29:user", "name": "Ada" },
        "recipient": { "id": "28:bot", "name": "Helper" },
        "conversation": { "id": "19:conv@thread.v2" },
        "locale": "en-US",
        "text": text
    })
}

pub fn request(payload: &Value) -> InboundRequest {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    InboundRequest::new(headers, Bytes::from(payload.to_string()))
}
