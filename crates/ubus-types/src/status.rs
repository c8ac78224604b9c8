//! # Status Codes
//!
//! gRPC-style status codes shared by the connector contract, the
//! registration API and RPC outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical status codes.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum UCode {
    #[default]
    OK = 0,
    CANCELLED = 1,
    UNKNOWN = 2,
    INVALID_ARGUMENT = 3,
    DEADLINE_EXCEEDED = 4,
    NOT_FOUND = 5,
    ALREADY_EXISTS = 6,
    PERMISSION_DENIED = 7,
    RESOURCE_EXHAUSTED = 8,
    FAILED_PRECONDITION = 9,
    ABORTED = 10,
    OUT_OF_RANGE = 11,
    UNIMPLEMENTED = 12,
    INTERNAL = 13,
    UNAVAILABLE = 14,
    DATA_LOSS = 15,
    UNAUTHENTICATED = 16,
}

impl UCode {
    /// Numeric value of the code.
    #[must_use]
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Map a numeric value back to a code. Unknown values become `UNKNOWN`.
    #[must_use]
    pub fn from_value(value: i32) -> Self {
        match value {
            0 => Self::OK,
            1 => Self::CANCELLED,
            3 => Self::INVALID_ARGUMENT,
            4 => Self::DEADLINE_EXCEEDED,
            5 => Self::NOT_FOUND,
            6 => Self::ALREADY_EXISTS,
            7 => Self::PERMISSION_DENIED,
            8 => Self::RESOURCE_EXHAUSTED,
            9 => Self::FAILED_PRECONDITION,
            10 => Self::ABORTED,
            11 => Self::OUT_OF_RANGE,
            12 => Self::UNIMPLEMENTED,
            13 => Self::INTERNAL,
            14 => Self::UNAVAILABLE,
            15 => Self::DATA_LOSS,
            16 => Self::UNAUTHENTICATED,
            _ => Self::UNKNOWN,
        }
    }

    /// Whether this is the success code.
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for UCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A failed status: code plus optional human-readable detail.
///
/// Successful operations return `Ok(..)`; a `UStatus` with code `OK` only
/// appears inside message attributes (comm-status) and never as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct UStatus {
    /// Status code.
    pub code: UCode,
    /// Optional detail.
    pub message: Option<String>,
}

impl UStatus {
    /// Status with a code and a detail message.
    pub fn fail_with_code(code: UCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Status with a code only.
    #[must_use]
    pub fn from_code(code: UCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Shorthand for `INVALID_ARGUMENT`.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::fail_with_code(UCode::INVALID_ARGUMENT, message)
    }

    /// The carried code.
    #[must_use]
    pub fn code(&self) -> UCode {
        self.code
    }
}

impl From<UCode> for UStatus {
    fn from(code: UCode) -> Self {
        Self::from_code(code)
    }
}
