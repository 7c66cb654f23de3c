//! # Vero Telemetry
//!
//! Structured logging for the appliance tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vero_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `gen-capture` | Service name attached to every log line |
//! | `VERO_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `VERO_CONSOLE_OUTPUT` | `true` | Emit logs at all |
//! | `VERO_JSON_LOGS` | `false` | JSON lines instead of human output |
//!
//! Logs always go to stderr; stdout belongs to the tool's own output.

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install log subscriber: {0}")]
    SubscriberInit(String),
}

/// Initialize logging for the process.
///
/// Can only succeed once per process; a second call returns
/// `TelemetryError::SubscriberInit`.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)
}

/// Convenience macro for a span tagged with the scenario step.
///
/// # Example
///
/// ```rust,ignore
/// let _span = step_span!("start_generator", channel = %channel).entered();
/// ```
#[macro_export]
macro_rules! step_span {
    ($step:expr) => {
        tracing::info_span!("step", step = $step)
    };
    ($step:expr, $($field:tt)*) => {
        tracing::info_span!("step", step = $step, $($field)*)
    };
}
