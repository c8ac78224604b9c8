//! In-memory Bus Connector.
//!
//! Loops sent messages straight back into the attached client when their
//! routing address has dispatching enabled, retains the last publication of
//! every topic, and lets tests script connection events and failures.
//!
//! Routing address per message type: publish and notification use `source`,
//! requests use `sink`. Responses are always delivered.

use crate::ports::{BusConnector, ConnectionCallback, UListener};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};
use ubus_types::{Address, Message, MessageType, UCode, UStatus};

/// Connector calls observed for one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounters {
    pub enable: usize,
    pub disable: usize,
    pub last_message: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

struct LoopbackState {
    link: LinkState,
    inbound: Option<Arc<dyn UListener>>,
    callback: Option<Arc<dyn ConnectionCallback>>,
    enabled: HashSet<Address>,
    retained: HashMap<Address, Message>,
    sent: Vec<Message>,
    connect_failure: Option<UCode>,
    enable_failure: Option<UCode>,
    send_failure: Option<UCode>,
}

/// Single-process [`BusConnector`] for demos and tests.
pub struct LoopbackConnector {
    state: Mutex<LoopbackState>,
    counters: DashMap<Address, DispatchCounters>,
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopbackState {
                link: LinkState::Disconnected,
                inbound: None,
                callback: None,
                enabled: HashSet::new(),
                retained: HashMap::new(),
                sent: Vec::new(),
                connect_failure: None,
                enable_failure: None,
                send_failure: None,
            }),
            counters: DashMap::new(),
        }
    }

    /// Simulate a transient transport loss.
    pub fn interrupt(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.link = LinkState::Disconnected;
            state.enabled.clear();
            state.callback.clone()
        };
        debug!("Loopback connection interrupted");
        if let Some(callback) = callback {
            callback.on_connection_interrupted();
        }
    }

    /// Push `message` into the attached client as if the transport delivered it.
    pub fn deliver(&self, message: Message) {
        let inbound = self.state.lock().inbound.clone();
        if let Some(inbound) = inbound {
            inbound.on_receive(message);
        }
    }

    /// Retain `message` as the last publication on its source topic without sending it.
    pub fn retain(&self, message: Message) {
        if let Some(attributes) = &message.attributes {
            let topic = attributes.source.clone();
            self.state.lock().retained.insert(topic, message);
        }
    }

    pub fn fail_connect_with(&self, code: Option<UCode>) {
        self.state.lock().connect_failure = code;
    }

    pub fn fail_enable_with(&self, code: Option<UCode>) {
        self.state.lock().enable_failure = code;
    }

    pub fn fail_send_with(&self, code: Option<UCode>) {
        self.state.lock().send_failure = code;
    }

    pub fn counters(&self, address: &Address) -> DispatchCounters {
        self.counters
            .get(address)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// Every message accepted by `send`, in order.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.state.lock().sent.clone()
    }

    pub fn is_enabled(&self, address: &Address) -> bool {
        self.state.lock().enabled.contains(address)
    }

    fn count(&self, address: &Address, bump: impl FnOnce(&mut DispatchCounters)) {
        bump(&mut self.counters.entry(address.clone()).or_default());
    }

    fn routing_address(message: &Message) -> Option<(MessageType, Address)> {
        let attributes = message.attributes.as_ref()?;
        let address = match attributes.message_type {
            MessageType::Publish | MessageType::Notification => attributes.source.clone(),
            MessageType::Request | MessageType::Response => attributes.sink.clone()?,
            MessageType::Unspecified => return None,
        };
        Some((attributes.message_type, address))
    }
}

#[async_trait]
impl BusConnector for LoopbackConnector {
    fn attach(&self, inbound: Arc<dyn UListener>, callback: Arc<dyn ConnectionCallback>) {
        let mut state = self.state.lock();
        state.inbound = Some(inbound);
        state.callback = Some(callback);
    }

    async fn connect(&self) -> Result<(), UStatus> {
        let callback = {
            let mut state = self.state.lock();
            if state.link == LinkState::Connected {
                return Ok(());
            }
            state.link = LinkState::Connecting;
            if let Some(code) = state.connect_failure {
                state.link = LinkState::Disconnected;
                return Err(UStatus::fail_with_code(code, "Loopback connect failed"));
            }
            state.link = LinkState::Connected;
            state.callback.clone()
        };
        debug!("Loopback connected");
        if let Some(callback) = callback {
            callback.on_connected();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), UStatus> {
        let callback = {
            let mut state = self.state.lock();
            if state.link == LinkState::Disconnected {
                return Ok(());
            }
            state.link = LinkState::Disconnected;
            state.enabled.clear();
            state.callback.clone()
        };
        debug!("Loopback disconnected");
        if let Some(callback) = callback {
            callback.on_disconnected();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().link == LinkState::Connected
    }

    fn is_connecting(&self) -> bool {
        self.state.lock().link == LinkState::Connecting
    }

    fn is_disconnected(&self) -> bool {
        self.state.lock().link == LinkState::Disconnected
    }

    fn send(&self, message: Message) -> Result<(), UStatus> {
        let (message_type, address) = Self::routing_address(&message)
            .ok_or_else(|| UStatus::invalid_argument("Message has no routing address"))?;
        let inbound = {
            let mut state = self.state.lock();
            if let Some(code) = state.send_failure {
                return Err(UStatus::fail_with_code(code, "Loopback send failed"));
            }
            if state.link != LinkState::Connected {
                return Err(UStatus::fail_with_code(UCode::UNAVAILABLE, "Not connected"));
            }
            state.sent.push(message.clone());

            if message_type == MessageType::Publish {
                state.retained.insert(address.clone(), message.clone());
            }
            if message_type == MessageType::Response || state.enabled.contains(&address) {
                state.inbound.clone()
            } else {
                None
            }
        };

        match inbound {
            Some(inbound) => inbound.on_receive(message),
            None => trace!("Sent message has no enabled route"),
        }
        Ok(())
    }

    fn enable_dispatching(&self, address: &Address) -> Result<(), UStatus> {
        self.count(address, |c| c.enable += 1);
        let mut state = self.state.lock();
        if let Some(code) = state.enable_failure {
            return Err(UStatus::fail_with_code(code, "Loopback enable failed"));
        }
        if state.link != LinkState::Connected {
            return Err(UStatus::fail_with_code(UCode::UNAVAILABLE, "Not connected"));
        }
        state.enabled.insert(address.clone());
        Ok(())
    }

    fn disable_dispatching(&self, address: &Address) -> Result<(), UStatus> {
        self.count(address, |c| c.disable += 1);
        if self.state.lock().enabled.remove(address) {
            Ok(())
        } else {
            Err(UStatus::fail_with_code(UCode::NOT_FOUND, "Address not enabled"))
        }
    }

    fn last_message(&self, address: &Address) -> Option<Message> {
        self.count(address, |c| c.last_message += 1);
        self.state.lock().retained.get(address).cloned()
    }
}
