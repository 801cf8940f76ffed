//! Telemetry helpers shared by the bot services.
//! Installs the tracing subscriber, builds per-turn spans, and records the turn counters through
//! the `metrics` facade.

use anyhow::Result;

mod config;
mod context;
mod counters;
mod tracing_init;

pub use config::TelemetryConfig;
pub use context::{TurnLabels, start_turn_span};
pub use counters::{record_connector_error, record_turn};
pub use tracing_init::init_telemetry;

/// Installs the shared subscriber configured from `RUST_LOG` and `LOG_FORMAT`.
pub fn install(service_name: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
    ))
}
