//! # Attribute Validator
//!
//! Pure checks applied to inbound attributes before dispatch:
//! type classification, ttl expiry and per-type well-formedness.

use crate::attributes::{Attributes, MessageType};
use thiserror::Error;

/// Why a set of attributes was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown message type")]
    UnknownType,

    #[error("message expired")]
    Expired,

    #[error("missing source address")]
    MissingSource,

    #[error("missing sink address")]
    MissingSink,

    #[error("sink is not a method address")]
    SinkNotMethod,

    #[error("missing request id")]
    MissingRequestId,

    #[error("priority {0:?} below RPC minimum")]
    PriorityTooLow(crate::attributes::Priority),
}

/// Classify the attributes. `Unspecified` means unknown.
#[must_use]
pub fn classify(attributes: &Attributes) -> MessageType {
    attributes.message_type
}

/// True when a positive ttl has elapsed at `now_ms`.
#[must_use]
pub fn is_expired(attributes: &Attributes, now_ms: u64) -> bool {
    match attributes.effective_ttl() {
        Some(ttl) => {
            let age = now_ms.saturating_sub(attributes.timestamp_ms);
            u128::from(age) >= ttl.as_millis()
        }
        None => false,
    }
}

/// Per-type well-formedness rules.
pub fn validate(attributes: &Attributes) -> Result<(), ValidationError> {
    let sink_present = attributes.sink.as_ref().is_some_and(|sink| !sink.is_empty());

    match classify(attributes) {
        MessageType::Unspecified => Err(ValidationError::UnknownType),
        MessageType::Publish => {
            if attributes.source.is_empty() {
                return Err(ValidationError::MissingSource);
            }
            Ok(())
        }
        MessageType::Notification => {
            if attributes.source.is_empty() {
                return Err(ValidationError::MissingSource);
            }
            if !sink_present {
                return Err(ValidationError::MissingSink);
            }
            Ok(())
        }
        MessageType::Request => {
            if attributes.source.is_empty() {
                return Err(ValidationError::MissingSource);
            }
            match &attributes.sink {
                None => return Err(ValidationError::MissingSink),
                Some(sink) if sink.is_empty() => return Err(ValidationError::MissingSink),
                Some(sink) if !sink.is_method() => return Err(ValidationError::SinkNotMethod),
                Some(_) => {}
            }
            check_rpc_priority(attributes)
        }
        MessageType::Response => {
            if !sink_present {
                return Err(ValidationError::MissingSink);
            }
            if attributes.reqid.is_none() {
                return Err(ValidationError::MissingRequestId);
            }
            check_rpc_priority(attributes)
        }
    }
}

/// Classify, reject unknown and expired, then apply the per-type rules.
pub fn validate_for_dispatch(attributes: &Attributes, now_ms: u64) -> Result<MessageType, ValidationError> {
    let message_type = classify(attributes);
    if message_type == MessageType::Unspecified {
        return Err(ValidationError::UnknownType);
    }
    if is_expired(attributes, now_ms) {
        return Err(ValidationError::Expired);
    }
    validate(attributes)?;
    Ok(message_type)
}

fn check_rpc_priority(attributes: &Attributes) -> Result<(), ValidationError> {
    if attributes.priority.is_rpc_capable() {
        Ok(())
    } else {
        Err(ValidationError::PriorityTooLow(attributes.priority))
    }
}
