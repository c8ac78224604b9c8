//! RPC call options.

use crate::attributes::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for an outbound RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Request priority; must be at least [`Priority::MIN_RPC`].
    pub priority: Priority,
    /// Request time to live; also bounds how long the call waits.
    pub ttl: Duration,
    /// Optional access token forwarded in the request attributes.
    pub token: Option<String>,
}

impl CallOptions {
    /// Default request time to live.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            priority: Priority::MIN_RPC,
            ttl: Self::DEFAULT_TTL,
            token: None,
        }
    }
}
