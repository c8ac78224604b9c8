//! Client configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `UBUS_RPC_TIMEOUT_MS` | `10000` | Timeout for calls whose ttl is zero |
//! | `UBUS_CALLBACK_MODE` | `serial` | `serial` or `pooled` callback execution |
//! | `UBUS_DELIVER_LAST_MESSAGE` | `true` | Replay the retained message to late listeners |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How application callbacks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackMode {
    /// One worker, callbacks run strictly in submission order.
    #[default]
    Serial,
    /// Each callback is spawned on the runtime and may run concurrently.
    Pooled,
}

impl FromStr for CallbackMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "pooled" => Ok(Self::Pooled),
            _ => Err(ConfigError::UnknownCallbackMode(s.to_string())),
        }
    }
}

impl fmt::Display for CallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::Pooled => f.write_str("pooled"),
        }
    }
}

/// Configuration for a [`UBusClient`](crate::UBusClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout applied to RPC calls whose ttl is zero
    pub default_rpc_timeout: Duration,
    /// Callback execution context used when none is supplied explicitly
    pub callback_mode: CallbackMode,
    /// Replay the connector's retained message to listeners joining an active topic
    pub deliver_last_message: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_rpc_timeout: Duration::from_millis(10_000),
            callback_mode: CallbackMode::Serial,
            deliver_last_message: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_rpc_timeout = match lookup("UBUS_RPC_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: "UBUS_RPC_TIMEOUT_MS",
                    value: raw,
                })?,
            None => defaults.default_rpc_timeout,
        };

        let callback_mode = match lookup("UBUS_CALLBACK_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.callback_mode,
        };

        let deliver_last_message = match lookup("UBUS_DELIVER_LAST_MESSAGE") {
            Some(raw) => parse_flag("UBUS_DELIVER_LAST_MESSAGE", raw)?,
            None => defaults.deliver_last_message,
        };

        let config = Self {
            default_rpc_timeout,
            callback_mode,
            deliver_last_message,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_rpc_timeout.is_zero() {
            return Err(ConfigError::ZeroRpcTimeout);
        }
        Ok(())
    }

    /// Builder-style method to set the default RPC timeout
    pub fn with_default_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.default_rpc_timeout = timeout;
        self
    }

    /// Builder-style method to set the callback mode
    pub fn with_callback_mode(mut self, mode: CallbackMode) -> Self {
        self.callback_mode = mode;
        self
    }

    /// Builder-style method to toggle retained-message replay
    pub fn with_deliver_last_message(mut self, deliver: bool) -> Self {
        self.deliver_last_message = deliver;
        self
    }
}

fn parse_flag(var: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue { var, value: raw }),
    }
}
