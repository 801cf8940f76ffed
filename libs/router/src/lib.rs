//! Route registry for typed activities.
//!
//! Routes are registered once during start-up. Registration enforces unique names and the
//! invoke-family exclusion rule; after that the router is read-only and dispatches each activity
//! to the first matching route.
pub mod error;
pub mod handler;
pub mod route;
pub mod router;

pub use error::*;
pub use handler::*;
pub use route::*;
pub use router::*;
