//! # uBus Types Crate
//!
//! Data definitions shared by every uBus crate: addresses, message
//! attributes, the message envelope and status codes, plus the pure
//! attribute validator used before dispatch.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all message-level types are defined here.
//! - **No Logic Beyond Validation**: the only behaviour in this crate is
//!   well-formedness, expiry and type classification of attributes.
//! - **Status Codes, Not Exceptions**: fallible operations across the
//!   workspace report a [`UStatus`] carrying a [`UCode`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod address;
pub mod attributes;
pub mod id;
pub mod message;
pub mod options;
pub mod status;
pub mod validator;

pub use address::{Address, AddressParseError, Entity, Resource};
pub use attributes::{Attributes, AttributesBuilder, MessageType, Priority};
pub use id::MessageId;
pub use message::Message;
pub use options::CallOptions;
pub use status::{UCode, UStatus};
pub use validator::ValidationError;

/// Milliseconds since the Unix epoch, saturating to zero on clock skew.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
