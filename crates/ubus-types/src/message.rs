//! Message envelope.

use crate::attributes::{Attributes, MessageType};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A bus message: optional payload plus optional attributes.
///
/// A message without attributes is never dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub payload: Option<Bytes>,
    pub attributes: Option<Attributes>,
}

impl Message {
    pub fn new(payload: Option<Bytes>, attributes: Attributes) -> Self {
        Self {
            payload,
            attributes: Some(attributes),
        }
    }

    /// Payload, or the empty default payload when absent.
    #[must_use]
    pub fn payload_or_empty(&self) -> Bytes {
        self.payload.clone().unwrap_or_default()
    }

    /// Message type, `Unspecified` when attributes are absent.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.attributes
            .as_ref()
            .map(|attrs| attrs.message_type)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::attributes::{AttributesBuilder, Priority};

    #[test]
    fn test_empty_payload_default() {
        let msg = Message::default();
        assert!(msg.payload_or_empty().is_empty());
        assert_eq!(msg.message_type(), MessageType::Unspecified);
    }

    #[test]
    fn test_message_type_from_attributes() {
        let attrs = AttributesBuilder::publish(Address::entity("a", 1), Priority::CS1).build();
        let msg = Message::new(Some(Bytes::from_static(b"42")), attrs);
        assert_eq!(msg.message_type(), MessageType::Publish);
        assert_eq!(msg.payload_or_empty(), Bytes::from_static(b"42"));
    }
}
