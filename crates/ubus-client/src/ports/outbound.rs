//! Outbound Ports (Driven Ports)
//!
//! Traits the client calls out through: the Bus Connector transport and
//! the application-supplied listener callbacks.

use crate::service::UBusClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use ubus_types::{Address, Message, UStatus};

/// Receives messages routed to an address.
///
/// Called on the client's callback executor, never on the transport thread.
pub trait UListener: Send + Sync {
    fn on_receive(&self, message: Message);
}

impl<F> UListener for F
where
    F: Fn(Message) + Send + Sync,
{
    fn on_receive(&self, message: Message) {
        self(message)
    }
}

/// Application hook told when the client becomes ready or loses the bus.
pub trait LifecycleListener: Send + Sync {
    fn on_lifecycle_changed(&self, client: &UBusClient, ready: bool);
}

impl<F> LifecycleListener for F
where
    F: Fn(&UBusClient, bool) + Send + Sync,
{
    fn on_lifecycle_changed(&self, client: &UBusClient, ready: bool) {
        self(client, ready)
    }
}

/// Connection-state callbacks a connector reports to its attached client.
pub trait ConnectionCallback: Send + Sync {
    fn on_connected(&self);

    /// Permanent teardown: the connector dropped every dispatching registration.
    fn on_disconnected(&self);

    /// Transient loss: registrations are re-enabled on the next `on_connected`.
    fn on_connection_interrupted(&self);
}

/// External transport collaborator (Driven Port).
///
/// Handed to the client fully constructed and authorized; the client
/// performs no discovery or permission checks of its own.
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// Wire the client's single inbound listener and connection callbacks.
    ///
    /// Called exactly once, while the client is being built.
    fn attach(&self, inbound: Arc<dyn UListener>, callback: Arc<dyn ConnectionCallback>);

    async fn connect(&self) -> Result<(), UStatus>;

    async fn disconnect(&self) -> Result<(), UStatus>;

    fn is_connected(&self) -> bool;

    fn is_connecting(&self) -> bool;

    fn is_disconnected(&self) -> bool;

    /// Accept or reject an outbound message. `Ok` is not a delivery confirmation.
    fn send(&self, message: Message) -> Result<(), UStatus>;

    /// Start routing messages for `address` to the inbound listener.
    ///
    /// The client calls this while holding its registry lock. Implementations
    /// must not invoke the inbound listener synchronously from inside this
    /// call; a retained message for `address` has to be delivered after it
    /// returns (from another task or the transport thread), or the client
    /// deadlocks.
    fn enable_dispatching(&self, address: &Address) -> Result<(), UStatus>;

    fn disable_dispatching(&self, address: &Address) -> Result<(), UStatus>;

    /// Best-effort disable that never fails observably.
    fn disable_dispatching_quietly(&self, address: &Address) {
        if let Err(status) = self.disable_dispatching(address) {
            debug!(
                address = %address,
                code = %status.code,
                "Ignoring disable dispatching failure"
            );
        }
    }

    /// Most recent retained message published to `address`, if any.
    fn last_message(&self, address: &Address) -> Option<Message>;
}
