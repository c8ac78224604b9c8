//! Inbound Ports (Driving Ports)
//!
//! The API applications use to talk to the bus.

use crate::domain::RpcCall;
use crate::ports::outbound::UListener;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use ubus_types::{Address, CallOptions, Message, UStatus};

/// Primary client API (Driving Port)
#[async_trait]
pub trait UClient: Send + Sync {
    /// Start receiving messages routed to `address`.
    ///
    /// # Errors
    /// - `INVALID_ARGUMENT` for the empty address
    /// - `ALREADY_EXISTS` when a method address already has a different listener
    /// - any code reported by the connector's `enable_dispatching`
    fn register_listener(&self, address: &Address, listener: Arc<dyn UListener>) -> Result<(), UStatus>;

    /// Stop delivering `address` to `listener`. Unknown pairs are a no-op.
    fn unregister_listener(&self, address: &Address, listener: Arc<dyn UListener>) -> Result<(), UStatus>;

    /// Remove `listener` from every address it is registered under.
    fn unregister_listener_everywhere(&self, listener: Arc<dyn UListener>) -> Result<(), UStatus>;

    /// Hand a message to the connector.
    fn send(&self, message: Message) -> Result<(), UStatus>;

    /// Call a remote method. Never blocks; the outcome arrives through the returned call.
    fn invoke_method(&self, method: &Address, payload: Bytes, options: CallOptions) -> RpcCall;

    async fn connect(&self) -> Result<(), UStatus>;

    async fn disconnect(&self) -> Result<(), UStatus>;

    fn is_connected(&self) -> bool;

    fn is_connecting(&self) -> bool;

    fn is_disconnected(&self) -> bool;
}
