//! # Connection Lifecycle Coordinator
//!
//! Reacts to connector callbacks and mirrors the connector's reported
//! state; it never initiates a transition itself.
//!
//! | Event | State | Registrations | Pending calls |
//! |-------|-------|---------------|---------------|
//! | connected | `Connected` | re-enabled | untouched |
//! | interrupted | `Disconnected` | kept | `CANCELLED` |
//! | disconnected | `Disconnected` | discarded | `CANCELLED` |
//! | `connect` returned | the connector's own | untouched | untouched |
//!
//! Each event submits exactly one task to the callback executor, whether or
//! not the application supplied a lifecycle listener, so scheduling looks
//! the same either way.

use crate::domain::{ConnectionState, ConnectionStateCell};
use crate::executor::CallbackExecutor;
use crate::ports::LifecycleListener;
use crate::service::client::UBusClient;
use crate::service::correlator::RpcCorrelator;
use crate::service::registry::ListenerRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns connection state and reacts to connector events.
pub struct LifecycleCoordinator {
    state: Arc<ConnectionStateCell>,
    registry: Arc<ListenerRegistry>,
    correlator: Arc<RpcCorrelator>,
    executor: Arc<dyn CallbackExecutor>,
    listener: Option<Arc<dyn LifecycleListener>>,
}

impl LifecycleCoordinator {
    pub fn new(
        state: Arc<ConnectionStateCell>,
        registry: Arc<ListenerRegistry>,
        correlator: Arc<RpcCorrelator>,
        executor: Arc<dyn CallbackExecutor>,
        listener: Option<Arc<dyn LifecycleListener>>,
    ) -> Self {
        Self {
            state,
            registry,
            correlator,
            executor,
            listener,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Align the state with what the connector reports after a `connect`
    /// call returned. A connector that was already connected, or that failed
    /// before any callback, fires no event for the coordinator to react to.
    pub fn reconcile(&self, connected: bool, connecting: bool) -> ConnectionState {
        let observed = if connected {
            ConnectionState::Connected
        } else if connecting {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        };
        let previous = self.state.set(observed);
        if previous != observed {
            debug!(previous = %previous, state = %observed, "Connection state reconciled with connector");
        }
        observed
    }

    pub fn on_connected(&self, client: UBusClient) {
        let previous = self.state.set(ConnectionState::Connected);
        info!(previous = %previous, "Connected to bus");

        let registry = Arc::clone(&self.registry);
        let listener = self.listener.clone();
        self.executor.execute(Box::pin(async move {
            registry.reestablish_all();
            if let Some(listener) = listener {
                listener.on_lifecycle_changed(&client, true);
            }
        }));
    }

    pub fn on_disconnected(&self, client: UBusClient) {
        let discarded = self.registry.clear();
        debug!(addresses = discarded, "Discarded registrations after disconnect");
        self.connection_lost(client, "Disconnected from bus");
    }

    pub fn on_connection_interrupted(&self, client: UBusClient) {
        self.connection_lost(client, "Connection interrupted");
    }

    fn connection_lost(&self, client: UBusClient, reason: &'static str) {
        let previous = self.state.set(ConnectionState::Disconnected);
        let cancelled = self.correlator.cancel_all(reason);
        warn!(previous = %previous, cancelled, "{reason}");

        let listener = self.listener.clone();
        self.executor.execute(Box::pin(async move {
            if let Some(listener) = listener {
                listener.on_lifecycle_changed(&client, false);
            }
        }));
    }
}
