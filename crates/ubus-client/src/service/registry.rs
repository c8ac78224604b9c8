//! # Listener Registry
//!
//! Ref-counted multimap from address to listeners. The first listener on an
//! address enables dispatching on the connector and the last one to leave
//! disables it, so the transport only ever sees one subscription per address
//! no matter how many application listeners share it.
//!
//! Method addresses accept a single listener.
//!
//! All map mutations and the connector calls they trigger happen under one
//! lock, so a registration cannot interleave with [`ListenerRegistry::reestablish_all`].

use crate::ports::{BusConnector, UListener};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};
use ubus_types::{Address, UCode, UStatus};

/// Listener compared by identity (the allocation it points to).
#[derive(Clone)]
pub struct ListenerHandle(Arc<dyn UListener>);

impl ListenerHandle {
    pub fn new(listener: Arc<dyn UListener>) -> Self {
        Self(listener)
    }

    pub fn listener(&self) -> &Arc<dyn UListener> {
        &self.0
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ListenerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ListenerHandle {}

impl Hash for ListenerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerHandle").field(&self.addr()).finish()
    }
}

/// What a successful registration changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First listener on the address; dispatching was enabled.
    Enabled,
    /// Listener joined an address that already had listeners.
    Joined,
    /// The pair was already registered.
    Unchanged,
}

/// Address → listeners map driving connector enable/disable calls.
pub struct ListenerRegistry {
    connector: Arc<dyn BusConnector>,
    listeners: Mutex<HashMap<Address, Vec<ListenerHandle>>>,
}

impl ListenerRegistry {
    pub fn new(connector: Arc<dyn BusConnector>) -> Self {
        Self {
            connector,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Add `listener` under `address`.
    ///
    /// A failed enable leaves no trace in the map.
    pub fn register(
        &self,
        address: &Address,
        listener: Arc<dyn UListener>,
    ) -> Result<Registration, UStatus> {
        if address.is_empty() {
            return Err(UStatus::invalid_argument("Address must not be empty"));
        }
        let handle = ListenerHandle::new(listener);
        let mut listeners = self.listeners.lock();

        match listeners.get_mut(address) {
            None => {
                if let Err(status) = self.connector.enable_dispatching(address) {
                    warn!(address = %address, code = %status.code, "Enable dispatching failed");
                    return Err(status);
                }
                listeners.insert(address.clone(), vec![handle]);
                debug!(address = %address, listener_count = 1, "Dispatching enabled");
                Ok(Registration::Enabled)
            }
            Some(existing) => {
                if existing.contains(&handle) {
                    return Ok(Registration::Unchanged);
                }
                if address.is_method() {
                    return Err(UStatus::fail_with_code(
                        UCode::ALREADY_EXISTS,
                        format!("Method {address} already has a listener"),
                    ));
                }
                existing.push(handle);
                debug!(address = %address, listener_count = existing.len(), "Listener joined");
                Ok(Registration::Joined)
            }
        }
    }

    /// Remove the `(address, listener)` pair. Unknown pairs are a no-op.
    pub fn unregister(&self, address: &Address, listener: &Arc<dyn UListener>) -> Result<(), UStatus> {
        if address.is_empty() {
            return Err(UStatus::invalid_argument("Address must not be empty"));
        }
        let handle = ListenerHandle::new(Arc::clone(listener));
        let mut listeners = self.listeners.lock();

        let Some(existing) = listeners.get_mut(address) else {
            return Ok(());
        };
        let before = existing.len();
        existing.retain(|registered| registered != &handle);
        if existing.len() == before {
            return Ok(());
        }
        if existing.is_empty() {
            listeners.remove(address);
            self.connector.disable_dispatching_quietly(address);
            debug!(address = %address, "Dispatching disabled");
        }
        Ok(())
    }

    /// Remove `listener` from every address, disabling addresses left empty.
    ///
    /// Returns how many registrations were removed.
    pub fn unregister_everywhere(&self, listener: &Arc<dyn UListener>) -> usize {
        let handle = ListenerHandle::new(Arc::clone(listener));
        let mut listeners = self.listeners.lock();
        let mut removed = 0;
        let mut emptied = Vec::new();

        for (address, registered) in listeners.iter_mut() {
            let before = registered.len();
            registered.retain(|candidate| candidate != &handle);
            removed += before - registered.len();
            if registered.is_empty() {
                emptied.push(address.clone());
            }
        }
        for address in emptied {
            listeners.remove(&address);
            self.connector.disable_dispatching_quietly(&address);
            debug!(address = %address, "Dispatching disabled");
        }
        removed
    }

    /// Re-enable dispatching for every address with at least one listener.
    pub fn reestablish_all(&self) {
        let listeners = self.listeners.lock();
        for (address, registered) in listeners.iter() {
            match self.connector.enable_dispatching(address) {
                Ok(()) => debug!(
                    address = %address,
                    listener_count = registered.len(),
                    "Dispatching re-enabled"
                ),
                Err(status) => warn!(
                    address = %address,
                    code = %status.code,
                    "Failed to re-enable dispatching"
                ),
            }
        }
    }

    /// Drop every registration without contacting the connector.
    pub fn clear(&self) -> usize {
        let mut listeners = self.listeners.lock();
        let count = listeners.len();
        listeners.clear();
        count
    }

    /// Snapshot of the listeners registered under `address`.
    pub fn listeners_for(&self, address: &Address) -> Vec<Arc<dyn UListener>> {
        self.listeners
            .lock()
            .get(address)
            .map(|registered| registered.iter().map(|h| Arc::clone(h.listener())).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, address: &Address) -> usize {
        self.listeners.lock().get(address).map_or(0, Vec::len)
    }

    pub fn is_registered(&self, address: &Address, listener: &Arc<dyn UListener>) -> bool {
        let handle = ListenerHandle::new(Arc::clone(listener));
        self.listeners
            .lock()
            .get(address)
            .is_some_and(|registered| registered.contains(&handle))
    }

    /// Addresses with at least one listener.
    pub fn addresses(&self) -> Vec<Address> {
        self.listeners.lock().keys().cloned().collect()
    }
}
