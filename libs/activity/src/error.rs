use thiserror::Error;

/// Errors raised while reading or validating an activity.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// A collaborator needed a field the activity does not carry.
    #[error("activity is missing required field `{field}`")]
    MissingField { field: &'static str },
    /// A property bag entry does not match the shape its typed accessor expects.
    #[error("activity property `{key}` has an unexpected shape: {source}")]
    Property {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// The payload could not be decoded into an activity envelope.
    #[error("activity payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ActivityError {
    pub fn missing(field: &'static str) -> Self {
        ActivityError::MissingField { field }
    }

    /// Returns the missing field name when this is a missing-field error.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            ActivityError::MissingField { field } => Some(field),
            _ => None,
        }
    }
}
