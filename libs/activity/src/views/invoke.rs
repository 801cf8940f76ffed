use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::ActivityKind;

/// Synchronous answer to an `invoke` activity, returned in the HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InvokeResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body))
    }
}

activity_view!(
    /// `invoke` activity: a request that expects a synchronous response.
    InvokeActivity => ActivityKind::Invoke
);

impl InvokeActivity {
    /// Invoke sub-kind, e.g. `adaptiveCard/action` or `composeExtension/query`.
    pub fn name(&self) -> Option<&str> {
        self.str_property("name")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_str_property("name", name);
    }

    pub fn value(&self) -> Option<&Value> {
        self.raw_property("value")
    }

    pub fn set_value(&mut self, value: Value) {
        self.properties.insert("value".into(), value);
    }
}

activity_view!(
    /// `event` activity; also the shape of proactive continuation turns.
    EventActivity => ActivityKind::Event
);

impl EventActivity {
    pub fn name(&self) -> Option<&str> {
        self.str_property("name")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_str_property("name", name);
    }

    pub fn value(&self) -> Option<&Value> {
        self.raw_property("value")
    }
}

activity_view!(
    /// `typing` indicator.
    TypingActivity => ActivityKind::Typing
);
