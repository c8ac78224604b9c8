//! Error types for client construction and configuration.
//!
//! Runtime outcomes of registry, dispatch and RPC operations are reported
//! as [`ubus_types::UStatus`] values instead.

use thiserror::Error;

/// Errors raised while loading configuration or building a client
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid RPC timeout: must be greater than zero")]
    ZeroRpcTimeout,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnvValue { var: &'static str, value: String },

    #[error("Unknown callback mode: '{0}' (expected 'serial' or 'pooled')")]
    UnknownCallbackMode(String),

    #[error("Client address must not be empty")]
    EmptyClientAddress,

    #[error("No tokio runtime available: build the client inside a runtime or supply a handle")]
    NoRuntime,
}
