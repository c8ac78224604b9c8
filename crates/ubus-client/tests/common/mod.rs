//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use ubus_client::test_utils::{CountingExecutor, RecordingLifecycleListener};
use ubus_client::{ClientConfig, LoopbackConnector, UBusClient, UClient};
use ubus_types::{Address, AttributesBuilder, Entity, Message, Priority};

pub struct Fixture {
    pub connector: Arc<LoopbackConnector>,
    pub executor: Arc<CountingExecutor>,
    pub lifecycle: Arc<RecordingLifecycleListener>,
    pub client: UBusClient,
}

impl Fixture {
    /// Build a client over a fresh loopback connector, without connecting.
    pub fn new(config: ClientConfig) -> Self {
        let connector = Arc::new(LoopbackConnector::new());
        let executor = Arc::new(CountingExecutor::new());
        let lifecycle = Arc::new(RecordingLifecycleListener::new());
        let client = UBusClient::builder(client_address(), connector.clone())
            .config(config)
            .executor(executor.clone())
            .lifecycle_listener(lifecycle.clone())
            .build()
            .expect("valid client configuration");
        Self {
            connector,
            executor,
            lifecycle,
            client,
        }
    }

    /// Build and connect, waiting for the lifecycle task to finish.
    pub async fn connected() -> Self {
        let fixture = Self::new(ClientConfig::default());
        fixture.client.connect().await.expect("loopback connects");
        fixture.settle().await;
        fixture
    }

    /// Wait until every callback submitted so far has run.
    pub async fn settle(&self) {
        self.executor.idle().await;
    }
}

pub fn client_address() -> Address {
    Address::entity("dashboard", 1)
}

pub fn entity() -> Entity {
    Entity::new("body.access", Some(1))
}

pub fn topic() -> Address {
    Address::topic(entity(), "door", Some("front_left"), Some("Door"))
}

pub fn other_topic() -> Address {
    Address::topic(entity(), "window", Some("front_left"), Some("Window"))
}

pub fn method() -> Address {
    Address::method(entity(), "UpdateDoor")
}

pub fn publish(topic: Address, payload: &'static [u8]) -> Message {
    Message::new(
        Some(Bytes::from_static(payload)),
        AttributesBuilder::publish(topic, Priority::CS1).build(),
    )
}

pub fn notification(topic: Address, sink: Address) -> Message {
    Message::new(
        Some(Bytes::from_static(b"notice")),
        AttributesBuilder::notification(topic, sink, Priority::CS1).build(),
    )
}

pub fn expiring_publish(topic: Address, ttl: Duration) -> Message {
    Message::new(
        None,
        AttributesBuilder::publish(topic, Priority::CS1)
            .with_ttl(ttl)
            .build(),
    )
}
