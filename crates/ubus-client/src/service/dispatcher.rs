//! # Message Dispatcher
//!
//! Single entry point for inbound traffic. Validates each message, then
//! fans it out to the listeners registered for its routing address or hands
//! responses to the RPC correlator. Rejected messages are logged and
//! dropped, never surfaced to the application.
//!
//! | Type | Routed by | Recipients |
//! |------|-----------|------------|
//! | Publish | `source` | every listener on the topic |
//! | Notification | `source` | every listener on the topic, only if `sink` is this client |
//! | Request | `sink` | the single method listener |
//! | Response | `reqid` | the pending call |

use crate::executor::CallbackExecutor;
use crate::metrics::ClientMetrics;
use crate::ports::UListener;
use crate::service::correlator::RpcCorrelator;
use crate::service::registry::ListenerRegistry;
use std::sync::Arc;
use tracing::{debug, warn};
use ubus_types::validator;
use ubus_types::{Address, Attributes, Message, MessageType};

/// Routes inbound messages to listeners or the correlator.
pub struct MessageDispatcher {
    client_address: Address,
    registry: Arc<ListenerRegistry>,
    correlator: Arc<RpcCorrelator>,
    executor: Arc<dyn CallbackExecutor>,
    metrics: Arc<ClientMetrics>,
}

impl MessageDispatcher {
    pub fn new(
        client_address: Address,
        registry: Arc<ListenerRegistry>,
        correlator: Arc<RpcCorrelator>,
        executor: Arc<dyn CallbackExecutor>,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            client_address,
            registry,
            correlator,
            executor,
            metrics,
        }
    }

    /// Handle one message from the connector.
    pub fn on_receive(&self, message: Message) {
        self.metrics.record_received();

        let Some(message_type) = self.accept(&message) else {
            self.metrics.record_dropped();
            return;
        };
        let Some(attributes) = message.attributes.as_ref() else {
            return;
        };

        match message_type {
            MessageType::Publish | MessageType::Notification => {
                let topic = attributes.source.clone();
                let listeners = self.registry.listeners_for(&topic);
                if listeners.is_empty() {
                    debug!(address = %topic, "No listeners for topic, dropping message");
                    self.metrics.record_dropped();
                    return;
                }
                self.deliver(listeners, message);
            }
            MessageType::Request => {
                let Some(method) = attributes.sink.clone() else {
                    return;
                };
                match self.registry.listeners_for(&method).into_iter().next() {
                    Some(listener) => self.deliver(vec![listener], message),
                    None => {
                        debug!(address = %method, "No handler for request, dropping message");
                        self.metrics.record_dropped();
                    }
                }
            }
            MessageType::Response => {
                if !self.correlator.handle_response(message) {
                    self.metrics.record_dropped();
                }
            }
            MessageType::Unspecified => self.metrics.record_dropped(),
        }
    }

    /// Deliver a connector-retained message to one newly joined listener,
    /// under the same validity rules as live traffic.
    pub fn deliver_retained(&self, message: Message, listener: Arc<dyn UListener>) {
        match self.accept(&message) {
            Some(MessageType::Publish | MessageType::Notification) => {
                self.deliver(vec![listener], message)
            }
            Some(other) => debug!(message_type = ?other, "Retained message is not a topic message"),
            None => {}
        }
    }

    /// Validate `message`, returning its type if it may be dispatched.
    fn accept(&self, message: &Message) -> Option<MessageType> {
        let Some(attributes) = message.attributes.as_ref() else {
            warn!("Dropping message without attributes");
            return None;
        };
        match validator::validate_for_dispatch(attributes, ubus_types::now_ms()) {
            Ok(MessageType::Notification) if !self.is_for_me(attributes) => {
                debug!(
                    request_id = %attributes.id,
                    sink = ?attributes.sink.as_ref().map(ToString::to_string),
                    "Dropping notification addressed to another client"
                );
                None
            }
            Ok(message_type) => Some(message_type),
            Err(reason) => {
                warn!(request_id = %attributes.id, reason = %reason, "Dropping invalid message");
                None
            }
        }
    }

    fn is_for_me(&self, attributes: &Attributes) -> bool {
        attributes.sink.as_ref() == Some(&self.client_address)
    }

    fn deliver(&self, listeners: Vec<Arc<dyn UListener>>, message: Message) {
        self.metrics.record_delivered(listeners.len());
        for listener in listeners {
            let message = message.clone();
            self.executor
                .execute(Box::pin(async move { listener.on_receive(message) }));
        }
    }
}
