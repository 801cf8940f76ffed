/// Scope requested for Bot Connector tokens.
pub const DEFAULT_CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Identity the bridge acts as when it builds per-turn credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub app_id: String,
    pub scope: String,
}

impl BridgeConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            scope: DEFAULT_CONNECTOR_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}
