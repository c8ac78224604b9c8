//! # uBus Client
//!
//! Application-facing handle wiring the registry, dispatcher, correlator and
//! lifecycle coordinator to one Bus Connector.
//!
//! The connector gets exactly one inbound listener and one connection
//! callback at build time. Both hold weak references, so dropping every
//! `UBusClient` clone tears the client down even while the connector lives on.

use crate::config::{CallbackMode, ClientConfig};
use crate::domain::{ConnectionState, ConnectionStateCell, RpcCall};
use crate::error::ConfigError;
use crate::executor::{CallbackExecutor, PooledExecutor, SerialExecutor};
use crate::metrics::{ClientMetrics, MetricsSnapshot};
use crate::ports::{BusConnector, ConnectionCallback, LifecycleListener, UClient, UListener};
use crate::service::correlator::RpcCorrelator;
use crate::service::dispatcher::MessageDispatcher;
use crate::service::lifecycle::LifecycleCoordinator;
use crate::service::registry::{ListenerRegistry, Registration};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info};
use ubus_types::{Address, CallOptions, Message, UStatus};

struct ClientInner {
    address: Address,
    connector: Arc<dyn BusConnector>,
    registry: Arc<ListenerRegistry>,
    dispatcher: Arc<MessageDispatcher>,
    correlator: Arc<RpcCorrelator>,
    lifecycle: LifecycleCoordinator,
    metrics: Arc<ClientMetrics>,
    config: ClientConfig,
}

/// Cloneable handle to a bus client.
#[derive(Clone)]
pub struct UBusClient {
    inner: Arc<ClientInner>,
}

impl UBusClient {
    /// Start building a client for the entity at `address`.
    pub fn builder(address: Address, connector: Arc<dyn BusConnector>) -> ClientBuilder {
        ClientBuilder {
            address,
            connector,
            config: ClientConfig::default(),
            executor: None,
            lifecycle_listener: None,
            runtime: None,
        }
    }

    /// This client's own address; notifications must target it.
    pub fn address(&self) -> &Address {
        &self.inner.address
    }

    /// Source address of outbound requests.
    pub fn reply_address(&self) -> &Address {
        self.inner.correlator.reply_address()
    }

    /// Connection state as observed through connector callbacks.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.lifecycle.state()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn pending_call_count(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    pub fn listener_count(&self, address: &Address) -> usize {
        self.inner.registry.listener_count(address)
    }
}

#[async_trait]
impl UClient for UBusClient {
    fn register_listener(&self, address: &Address, listener: Arc<dyn UListener>) -> Result<(), UStatus> {
        let registration = self.inner.registry.register(address, Arc::clone(&listener))?;
        if registration == Registration::Joined && self.inner.config.deliver_last_message {
            if let Some(retained) = self.inner.connector.last_message(address) {
                debug!(address = %address, "Replaying retained message to new listener");
                self.inner.dispatcher.deliver_retained(retained, listener);
            }
        }
        Ok(())
    }

    fn unregister_listener(&self, address: &Address, listener: Arc<dyn UListener>) -> Result<(), UStatus> {
        self.inner.registry.unregister(address, &listener)
    }

    fn unregister_listener_everywhere(&self, listener: Arc<dyn UListener>) -> Result<(), UStatus> {
        let removed = self.inner.registry.unregister_everywhere(&listener);
        debug!(removed, "Listener unregistered everywhere");
        Ok(())
    }

    fn send(&self, message: Message) -> Result<(), UStatus> {
        if message.attributes.is_none() {
            return Err(UStatus::invalid_argument("Message attributes are missing"));
        }
        self.inner.connector.send(message)
    }

    fn invoke_method(&self, method: &Address, payload: Bytes, options: CallOptions) -> RpcCall {
        self.inner.correlator.invoke(method, payload, options)
    }

    async fn connect(&self) -> Result<(), UStatus> {
        let result = self.inner.connector.connect().await;
        self.inner.lifecycle.reconcile(
            self.inner.connector.is_connected(),
            self.inner.connector.is_connecting(),
        );
        result
    }

    async fn disconnect(&self) -> Result<(), UStatus> {
        self.inner.connector.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.connector.is_connected()
    }

    fn is_connecting(&self) -> bool {
        self.inner.connector.is_connecting()
    }

    fn is_disconnected(&self) -> bool {
        self.inner.connector.is_disconnected()
    }
}

impl fmt::Debug for UBusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UBusClient")
            .field("address", &self.inner.address.to_string())
            .field("state", &self.connection_state())
            .finish()
    }
}

/// Builder for [`UBusClient`].
pub struct ClientBuilder {
    address: Address,
    connector: Arc<dyn BusConnector>,
    config: ClientConfig,
    executor: Option<Arc<dyn CallbackExecutor>>,
    lifecycle_listener: Option<Arc<dyn LifecycleListener>>,
    runtime: Option<Handle>,
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `executor` for callbacks instead of one built from the config.
    pub fn executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn lifecycle_listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.lifecycle_listener = Some(listener);
        self
    }

    /// Runtime for timers and default executors. Defaults to the current runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Validate the configuration, wire the components and attach to the connector.
    pub fn build(self) -> Result<UBusClient, ConfigError> {
        self.config.validate()?;
        if self.address.is_empty() {
            return Err(ConfigError::EmptyClientAddress);
        }
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        let executor: Arc<dyn CallbackExecutor> = match self.executor {
            Some(executor) => executor,
            None => match self.config.callback_mode {
                CallbackMode::Serial => Arc::new(SerialExecutor::new(&runtime)),
                CallbackMode::Pooled => Arc::new(PooledExecutor::new(runtime.clone())),
            },
        };

        let metrics = Arc::new(ClientMetrics::new());
        let registry = Arc::new(ListenerRegistry::new(Arc::clone(&self.connector)));
        let correlator = Arc::new(RpcCorrelator::new(
            Arc::clone(&self.connector),
            self.address.to_rpc_response(),
            runtime,
            self.config.default_rpc_timeout,
            Arc::clone(&metrics),
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            self.address.clone(),
            Arc::clone(&registry),
            Arc::clone(&correlator),
            Arc::clone(&executor),
            Arc::clone(&metrics),
        ));
        let lifecycle = LifecycleCoordinator::new(
            Arc::new(ConnectionStateCell::default()),
            Arc::clone(&registry),
            Arc::clone(&correlator),
            executor,
            self.lifecycle_listener,
        );

        let inner = Arc::new(ClientInner {
            address: self.address,
            connector: self.connector,
            registry,
            dispatcher,
            correlator,
            lifecycle,
            metrics,
            config: self.config,
        });

        inner.connector.attach(
            Arc::new(InboundListener {
                dispatcher: Arc::downgrade(&inner.dispatcher),
            }),
            Arc::new(ConnectionHandler {
                client: Arc::downgrade(&inner),
            }),
        );
        info!(address = %inner.address, mode = %inner.config.callback_mode, "Client created");

        Ok(UBusClient { inner })
    }
}

/// The one listener the connector sees; feeds the dispatcher.
struct InboundListener {
    dispatcher: Weak<MessageDispatcher>,
}

impl UListener for InboundListener {
    fn on_receive(&self, message: Message) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.on_receive(message);
        }
    }
}

struct ConnectionHandler {
    client: Weak<ClientInner>,
}

impl ConnectionHandler {
    fn client(&self) -> Option<UBusClient> {
        self.client.upgrade().map(|inner| UBusClient { inner })
    }
}

impl ConnectionCallback for ConnectionHandler {
    fn on_connected(&self) {
        if let Some(client) = self.client() {
            client.inner.lifecycle.on_connected(client.clone());
        }
    }

    fn on_disconnected(&self) {
        if let Some(client) = self.client() {
            client.inner.lifecycle.on_disconnected(client.clone());
        }
    }

    fn on_connection_interrupted(&self) {
        if let Some(client) = self.client() {
            client.inner.lifecycle.on_connection_interrupted(client.clone());
        }
    }
}
