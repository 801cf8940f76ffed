use thiserror::Error;

/// Registration-time invariant violation. Always a start-up defect.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("route name must not be empty")]
    EmptyName,
    #[error("route `{name}` is already registered")]
    DuplicateRoute { name: String },
    #[error(
        "cannot register catch-all invoke route `{name}`: specific invoke route `{existing}` is already registered"
    )]
    InvokeCatchAllConflict { name: String, existing: String },
    #[error(
        "cannot register invoke route `{name}`: a catch-all `invoke` route is already registered"
    )]
    InvokeSpecificConflict { name: String },
}

/// A route handler failed while handling a dispatched activity.
#[derive(Debug, Error)]
#[error("route `{route}` failed: {source}")]
pub struct DispatchError {
    pub route: String,
    #[source]
    pub source: anyhow::Error,
}

impl DispatchError {
    pub fn into_source(self) -> anyhow::Error {
        self.source
    }
}
