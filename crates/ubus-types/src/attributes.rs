//! # Message Attributes
//!
//! Metadata every bus message carries: identity, type, routing addresses,
//! quality of service and RPC correlation fields.

use crate::address::Address;
use crate::id::MessageId;
use crate::status::UCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageType {
    /// Not set or not recognised; never dispatched.
    #[default]
    Unspecified,
    /// Topic publication, routed by `source`.
    Publish,
    /// Topic notification directed at one `sink`, routed by `source`.
    Notification,
    /// RPC request, routed by `sink` (the method address).
    Request,
    /// RPC response, routed by `reqid`.
    Response,
}

/// Class-of-service priority. Ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Unspecified,
    CS0,
    CS1,
    CS2,
    CS3,
    CS4,
    CS5,
    CS6,
}

impl Priority {
    /// Lowest priority accepted for RPC requests and responses.
    pub const MIN_RPC: Priority = Priority::CS4;

    /// Whether this priority may carry RPC traffic.
    #[must_use]
    pub fn is_rpc_capable(self) -> bool {
        self >= Self::MIN_RPC
    }
}

/// Attributes of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Unique message id.
    pub id: MessageId,
    /// Message kind.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Origin address: topic for publish/notification, reply endpoint for requests.
    pub source: Address,
    /// Destination address, if directed.
    pub sink: Option<Address>,
    /// Class of service.
    pub priority: Priority,
    /// Time to live, measured from `timestamp_ms`. `None` or zero never expires.
    pub ttl: Option<Duration>,
    /// Access token forwarded with requests.
    pub token: Option<String>,
    /// Application-level status carried by responses.
    pub commstatus: Option<UCode>,
    /// Id of the request a response answers.
    pub reqid: Option<MessageId>,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl Attributes {
    /// Effective ttl: `None` when absent or zero.
    #[must_use]
    pub fn effective_ttl(&self) -> Option<Duration> {
        self.ttl.filter(|ttl| !ttl.is_zero())
    }
}

/// Fluent builder for [`Attributes`].
///
/// # Example
///
/// ```
/// use ubus_types::{Address, AttributesBuilder, Entity, MessageType, Priority};
/// use std::time::Duration;
///
/// let method = Address::method(Entity::new("hvac", Some(1)), "SetTemperature");
/// let reply = Address::entity("dashboard", 1).to_rpc_response();
///
/// let request = AttributesBuilder::request(reply, method, Priority::CS4, Duration::from_secs(1))
///     .with_token("secret")
///     .build();
/// assert_eq!(request.message_type, MessageType::Request);
///
/// let response = AttributesBuilder::response(&request).build();
/// assert_eq!(response.reqid, Some(request.id));
/// ```
#[derive(Debug, Clone)]
pub struct AttributesBuilder {
    message_type: MessageType,
    source: Address,
    sink: Option<Address>,
    priority: Priority,
    ttl: Option<Duration>,
    token: Option<String>,
    commstatus: Option<UCode>,
    reqid: Option<MessageId>,
    id: Option<MessageId>,
}

impl AttributesBuilder {
    fn new(message_type: MessageType, source: Address, priority: Priority) -> Self {
        Self {
            message_type,
            source,
            sink: None,
            priority,
            ttl: None,
            token: None,
            commstatus: None,
            reqid: None,
            id: None,
        }
    }

    /// Publication on topic `source`.
    #[must_use]
    pub fn publish(source: Address, priority: Priority) -> Self {
        Self::new(MessageType::Publish, source, priority)
    }

    /// Notification from topic `source` to `sink`.
    #[must_use]
    pub fn notification(source: Address, sink: Address, priority: Priority) -> Self {
        Self::new(MessageType::Notification, source, priority).with_sink(sink)
    }

    /// Request from reply endpoint `source` to method `sink`.
    #[must_use]
    pub fn request(source: Address, sink: Address, priority: Priority, ttl: Duration) -> Self {
        Self::new(MessageType::Request, source, priority)
            .with_sink(sink)
            .with_ttl(ttl)
    }

    /// Response answering `request`: source and sink swapped, priority kept.
    #[must_use]
    pub fn response(request: &Attributes) -> Self {
        let mut builder = Self::new(
            MessageType::Response,
            request.sink.clone().unwrap_or_default(),
            request.priority,
        )
        .with_sink(request.source.clone());
        builder.reqid = Some(request.id);
        builder.ttl = request.ttl;
        builder
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Address) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_commstatus(mut self, code: UCode) -> Self {
        self.commstatus = Some(code);
        self
    }

    #[must_use]
    pub fn with_reqid(mut self, reqid: MessageId) -> Self {
        self.reqid = Some(reqid);
        self
    }

    /// Pin the id instead of generating one on `build()`.
    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Routing fingerprint of the attributes this builder produces.
    #[must_use]
    pub fn fingerprint(&self) -> (Address, Option<Address>, Priority, Option<Duration>) {
        (
            self.source.clone(),
            self.sink.clone(),
            self.priority,
            self.ttl,
        )
    }

    /// Build the attributes, stamping an id (unless pinned) and the current time.
    #[must_use]
    pub fn build(self) -> Attributes {
        let id = self.id.unwrap_or_default();
        Attributes {
            id,
            message_type: self.message_type,
            source: self.source,
            sink: self.sink,
            priority: self.priority,
            ttl: self.ttl,
            token: self.token,
            commstatus: self.commstatus,
            reqid: self.reqid,
            timestamp_ms: id.timestamp_ms().unwrap_or_else(crate::now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Entity;

    fn method() -> Address {
        Address::method(Entity::new("hvac", Some(1)), "SetTemperature")
    }

    fn reply() -> Address {
        Address::entity("dashboard", 1).to_rpc_response()
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::CS6 > Priority::CS4);
        assert!(Priority::CS4.is_rpc_capable());
        assert!(!Priority::CS3.is_rpc_capable());
        assert!(!Priority::Unspecified.is_rpc_capable());
    }

    #[test]
    fn test_request_builder() {
        let attrs = AttributesBuilder::request(reply(), method(), Priority::CS5, Duration::from_millis(500))
            .with_token("t0k3n")
            .build();

        assert_eq!(attrs.message_type, MessageType::Request);
        assert_eq!(attrs.source, reply());
        assert_eq!(attrs.sink, Some(method()));
        assert_eq!(attrs.priority, Priority::CS5);
        assert_eq!(attrs.ttl, Some(Duration::from_millis(500)));
        assert_eq!(attrs.token.as_deref(), Some("t0k3n"));
        assert!(attrs.reqid.is_none());
    }

    #[test]
    fn test_response_swaps_routing() {
        let request =
            AttributesBuilder::request(reply(), method(), Priority::CS4, Duration::from_secs(1))
                .build();
        let response = AttributesBuilder::response(&request)
            .with_commstatus(UCode::OK)
            .build();

        assert_eq!(response.message_type, MessageType::Response);
        assert_eq!(response.source, method());
        assert_eq!(response.sink, Some(reply()));
        assert_eq!(response.reqid, Some(request.id));
        assert_eq!(response.priority, request.priority);
        assert_eq!(response.commstatus, Some(UCode::OK));
        assert_ne!(response.id, request.id);
    }

    #[test]
    fn test_timestamp_follows_id() {
        let attrs = AttributesBuilder::publish(method(), Priority::CS1).build();
        assert_eq!(Some(attrs.timestamp_ms), attrs.id.timestamp_ms());
    }

    #[test]
    fn test_effective_ttl_treats_zero_as_unbounded() {
        let attrs = AttributesBuilder::publish(method(), Priority::CS1)
            .with_ttl(Duration::ZERO)
            .build();
        assert!(attrs.effective_ttl().is_none());
    }

    #[test]
    fn test_fingerprint_ignores_token_and_id() {
        let a = AttributesBuilder::request(reply(), method(), Priority::CS4, Duration::from_secs(1))
            .with_token("a");
        let b = AttributesBuilder::request(reply(), method(), Priority::CS4, Duration::from_secs(1))
            .with_token("b");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_serde_uses_type_key() {
        let attrs = AttributesBuilder::publish(method(), Priority::CS1).build();
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["type"], "Publish");
    }
}
