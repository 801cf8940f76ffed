use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use gsm_activity::ChannelAccount;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::TransportError;

/// Delegated identity of an automated actor, taken from an agentic recipient account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgenticIdentity {
    pub app_instance_id: String,
    pub user_id: Option<String>,
}

impl AgenticIdentity {
    /// `None` unless the account carries an agentic role and an agentic app id.
    pub fn from_account(account: &ChannelAccount) -> Option<Self> {
        if !account.is_agentic() {
            return None;
        }
        let app_instance_id = account
            .agentic_app_id
            .clone()
            .filter(|id| !id.is_empty())?;
        Some(Self {
            app_instance_id,
            user_id: account.agentic_user_id.clone(),
        })
    }
}

/// What a turn asks a [`TokenProvider`] for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub app_id: String,
    pub scope: String,
    pub agentic: Option<AgenticIdentity>,
}

/// Source of bearer tokens for connector calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, request: &TokenRequest) -> Result<String, TransportError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// OAuth2 client-credentials grant against the configured authority.
///
/// An authority starting with `mock://` skips the network and yields `mock-token`.
/// Agentic identities are forwarded in the request but this provider always authenticates as the
/// application itself.
pub struct ClientCredentialsTokenProvider {
    client: reqwest::Client,
    auth_base: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsTokenProvider {
    pub fn new(
        auth_base: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent("gsm-bot-bridge/0.4")
            .build()
            .map_err(|source| TransportError::Http {
                operation: "token",
                source,
            })?;
        Ok(Self {
            client,
            auth_base: auth_base.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.auth_base.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    async fn access_token(&self, request: &TokenRequest) -> Result<String, TransportError> {
        if self.auth_base.starts_with("mock://") {
            return Ok("mock-token".into());
        }
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(TransportError::Token(
                "client id and secret must be configured".into(),
            ));
        }
        if let Some(agentic) = &request.agentic {
            debug!(app_instance = %agentic.app_instance_id, "requesting app token for agentic turn");
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", request.scope.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|source| TransportError::Http {
                operation: "token",
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Http {
                operation: "token",
                source,
            })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "token request rejected");
            return Err(TransportError::Status {
                operation: "token",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|source| TransportError::Decode {
                operation: "token",
                source,
            })?;
        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| TransportError::Token("response carried no access_token".into()))
    }
}

/// Credential stub injected into one turn.
///
/// The token is requested lazily on first use and remembered only for the lifetime of this
/// value, which never outlives its turn.
pub struct TurnCredentials {
    request: TokenRequest,
    provider: Arc<dyn TokenProvider>,
    token: OnceCell<String>,
}

impl TurnCredentials {
    pub fn new(
        app_id: impl Into<String>,
        config: &BridgeConfig,
        agentic: Option<AgenticIdentity>,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            request: TokenRequest {
                app_id: app_id.into(),
                scope: config.scope.clone(),
                agentic,
            },
            provider,
            token: OnceCell::new(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.request.app_id
    }

    pub fn scope(&self) -> &str {
        &self.request.scope
    }

    pub fn agentic(&self) -> Option<&AgenticIdentity> {
        self.request.agentic.as_ref()
    }

    /// Bearer token for this turn. Provider failures surface unchanged.
    pub async fn token(&self) -> Result<String, TransportError> {
        self.token
            .get_or_try_init(|| self.provider.access_token(&self.request))
            .await
            .cloned()
    }
}

impl fmt::Debug for TurnCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnCredentials")
            .field("app_id", &self.request.app_id)
            .field("scope", &self.request.scope)
            .field("agentic", &self.request.agentic)
            .field("token_acquired", &self.token.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsm_activity::AGENTIC_APP_INSTANCE_ROLE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn access_token(&self, request: &TokenRequest) -> Result<String, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}-{n}", request.app_id))
        }
    }

    #[tokio::test]
    async fn token_is_requested_once_per_turn() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let config = BridgeConfig::new("app");
        let first = TurnCredentials::new("app", &config, None, provider.clone());
        assert_eq!(first.token().await.unwrap(), "app-0");
        assert_eq!(first.token().await.unwrap(), "app-0");

        let second = TurnCredentials::new("app", &config, None, provider.clone());
        assert_eq!(second.token().await.unwrap(), "app-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mock_authority_short_circuits() {
        let provider =
            ClientCredentialsTokenProvider::new("mock://login", "tenant", "", "").unwrap();
        let request = TokenRequest {
            app_id: "app".into(),
            scope: "scope".into(),
            agentic: None,
        };
        assert_eq!(provider.access_token(&request).await.unwrap(), "mock-token");
    }

    #[tokio::test]
    async fn missing_secret_is_a_token_error() {
        let provider =
            ClientCredentialsTokenProvider::new("https://login.example", "tenant", "id", " ")
                .unwrap();
        let request = TokenRequest {
            app_id: "id".into(),
            scope: "scope".into(),
            agentic: None,
        };
        let err = provider.access_token(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Token(_)));
    }

    #[test]
    fn agentic_identity_requires_role_and_app_id() {
        let mut account = ChannelAccount::new("28:agent");
        assert!(AgenticIdentity::from_account(&account).is_none());

        account.role = Some(AGENTIC_APP_INSTANCE_ROLE.into());
        assert!(AgenticIdentity::from_account(&account).is_none());

        account.agentic_app_id = Some("instance-1".into());
        account.agentic_user_id = Some("user-1".into());
        let identity = AgenticIdentity::from_account(&account).unwrap();
        assert_eq!(identity.app_instance_id, "instance-1");
        assert_eq!(identity.user_id.as_deref(), Some("user-1"));
    }
}
