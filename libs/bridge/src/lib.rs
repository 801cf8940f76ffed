//! Turn pipeline for Greentic bots.
//!
//! [`CompatibilityBridge`] turns an inbound request (or a stored conversation reference) into one
//! canonical activity, builds the turn context with per-turn credentials and a conversation
//! operations proxy, and runs modern and legacy middleware plus the terminal handler over it.
pub mod auth;
pub mod bridge;
pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod middleware;
pub mod operations;
pub mod state;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use auth::*;
pub use bridge::*;
pub use config::*;
pub use connector::*;
pub use context::*;
pub use error::*;
pub use middleware::*;
pub use operations::*;
pub use state::*;
