use gsm_activity::{Activity, ActivityError};
use thiserror::Error;

/// Failure raised by a handler or middleware during a turn.
///
/// When the error carries the activity the turn was processing, a registered turn-error
/// callback can observe it; otherwise the error always reaches the transport.
#[derive(Debug, Error)]
#[error("turn handler failed: {source}")]
pub struct HandlerError {
    #[source]
    source: anyhow::Error,
    activity: Option<Box<Activity>>,
}

impl HandlerError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: source.into(),
            activity: None,
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = Some(Box::new(activity));
        self
    }

    /// Attaches `activity` unless an activity is already attached.
    pub fn or_activity(self, activity: impl FnOnce() -> Activity) -> Self {
        if self.activity.is_some() {
            self
        } else {
            self.with_activity(activity())
        }
    }

    pub fn activity(&self) -> Option<&Activity> {
        self.activity.as_deref()
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.source
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.source
    }

    /// Splits collaborator failures back out of a handler error.
    ///
    /// A transport failure, a missing required field, or cancellation that a handler merely
    /// propagated keeps its own class; anything else stays a [`BridgeError::Handler`].
    pub fn into_bridge_error(self) -> BridgeError {
        let HandlerError { source, activity } = self;
        let source = match source.downcast::<BridgeError>() {
            Ok(BridgeError::Handler(inner)) => return inner.into_bridge_error(),
            Ok(BridgeError::Transport(TransportError::Cancelled { .. })) => {
                return BridgeError::Cancelled;
            }
            Ok(other) => return other,
            Err(source) => source,
        };
        let source = match source.downcast::<HandlerError>() {
            Ok(inner) => return inner.into_bridge_error(),
            Err(source) => source,
        };
        let source = match source.downcast::<TransportError>() {
            Ok(TransportError::Cancelled { .. }) => return BridgeError::Cancelled,
            Ok(err) => return BridgeError::Transport(err),
            Err(source) => source,
        };
        let missing_field = source
            .downcast_ref::<ActivityError>()
            .is_some_and(|err| err.missing_field().is_some());
        let source = if missing_field {
            match source.downcast::<ActivityError>() {
                Ok(err) => return BridgeError::Argument(err),
                Err(source) => source,
            }
        } else {
            source
        };
        BridgeError::Handler(HandlerError { source, activity })
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        // Keep the attached activity when a HandlerError travelled through anyhow.
        match err.downcast::<HandlerError>() {
            Ok(handler_err) => handler_err,
            Err(err) => HandlerError::new(err),
        }
    }
}

impl From<BridgeError> for HandlerError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Handler(handler_err) => handler_err,
            other => HandlerError::new(other),
        }
    }
}

/// Failure talking to the platform's HTTP API.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{operation} request failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} response could not be decoded: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("token acquisition failed: {0}")]
    Token(String),
    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },
}

impl TransportError {
    /// Whether the outbound layer may retry. The bridge itself never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required activity field was missing where a collaborator needed it.
    #[error(transparent)]
    Argument(#[from] ActivityError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("turn was cancelled")]
    Cancelled,
    #[error("invalid inbound request: {0}")]
    InvalidRequest(String),
    #[error("turn state has no `{key}` entry")]
    MissingService { key: &'static str },
}

impl BridgeError {
    /// The missing field name, for argument errors.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            BridgeError::Argument(err) => err.missing_field(),
            _ => None,
        }
    }
}
