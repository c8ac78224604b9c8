//! # uBus Telemetry
//!
//! Process-boundary logging setup for applications embedding the uBus
//! client. Library crates only emit `tracing` events; binaries and test
//! harnesses call [`init_logging`] once to install a subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ubus_telemetry::{init_logging, TelemetryConfig};
//!
//! let _guard = init_logging(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `UBUS_SERVICE_NAME` | `ubus-client` | Service name in logs |
//! | `UBUS_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `UBUS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `UBUS_JSON_LOGS` | `false` | JSON output (defaults to true in containers) |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
