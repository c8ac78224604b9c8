//! # Third-Party Connector Integration
//!
//! The client drives any `BusConnector`, not only the loopback. This module
//! plugs in a minimal connector with an access list and checks that the
//! client surfaces the connector's decisions unchanged, and that messages a
//! connector delivers once `enable_dispatching` has returned reach listeners.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::task::JoinHandle;

    use ubus_client::test_utils::{CountingExecutor, RecordingListener};
    use ubus_client::{BusConnector, ConnectionCallback, UBusClient, UClient, UListener};
    use ubus_types::{Address, AttributesBuilder, Entity, Message, Priority, UCode, UStatus};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Default)]
    struct GatewayState {
        connected: bool,
        callback: Option<Arc<dyn ConnectionCallback>>,
        inbound: Option<Arc<dyn UListener>>,
        enabled: HashSet<Address>,
        calls: Vec<String>,
        greetings: Vec<JoinHandle<()>>,
    }

    /// Connector that only lets the client subscribe to allowed addresses.
    ///
    /// With a greeting configured, every newly enabled address receives it
    /// from a separate task once `enable_dispatching` has returned.
    struct GatewayConnector {
        allowed: HashSet<Address>,
        greeting: Option<Message>,
        state: Mutex<GatewayState>,
    }

    impl GatewayConnector {
        fn new(allowed: impl IntoIterator<Item = Address>) -> Self {
            Self {
                allowed: allowed.into_iter().collect(),
                greeting: None,
                state: Mutex::new(GatewayState::default()),
            }
        }

        fn with_greeting(mut self, greeting: Message) -> Self {
            self.greeting = Some(greeting);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().calls.clone()
        }

        /// Wait for every greeting scheduled so far.
        async fn flush_greetings(&self) {
            let greetings = std::mem::take(&mut self.state.lock().greetings);
            for greeting in greetings {
                greeting.await.unwrap();
            }
        }
    }

    #[async_trait]
    impl BusConnector for GatewayConnector {
        fn attach(&self, inbound: Arc<dyn UListener>, callback: Arc<dyn ConnectionCallback>) {
            let mut state = self.state.lock();
            state.inbound = Some(inbound);
            state.callback = Some(callback);
        }

        async fn connect(&self) -> Result<(), UStatus> {
            let callback = {
                let mut state = self.state.lock();
                state.connected = true;
                state.callback.clone()
            };
            if let Some(callback) = callback {
                callback.on_connected();
            }
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), UStatus> {
            let callback = {
                let mut state = self.state.lock();
                state.connected = false;
                state.enabled.clear();
                state.callback.clone()
            };
            if let Some(callback) = callback {
                callback.on_disconnected();
            }
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.state.lock().connected
        }

        fn is_connecting(&self) -> bool {
            false
        }

        fn is_disconnected(&self) -> bool {
            !self.is_connected()
        }

        fn send(&self, _message: Message) -> Result<(), UStatus> {
            Err(UStatus::fail_with_code(UCode::UNIMPLEMENTED, "Gateway is receive-only"))
        }

        fn enable_dispatching(&self, address: &Address) -> Result<(), UStatus> {
            let mut state = self.state.lock();
            state.calls.push(format!("enable {address}"));
            if !self.allowed.contains(address) {
                return Err(UStatus::fail_with_code(
                    UCode::PERMISSION_DENIED,
                    format!("{address} is not on the access list"),
                ));
            }
            if state.enabled.insert(address.clone()) {
                if let (Some(inbound), Some(greeting)) =
                    (state.inbound.clone(), self.greeting.clone())
                {
                    state
                        .greetings
                        .push(tokio::spawn(async move { inbound.on_receive(greeting) }));
                }
            }
            Ok(())
        }

        fn disable_dispatching(&self, address: &Address) -> Result<(), UStatus> {
            let mut state = self.state.lock();
            state.calls.push(format!("disable {address}"));
            state.enabled.remove(address);
            Ok(())
        }

        fn last_message(&self, _address: &Address) -> Option<Message> {
            None
        }
    }

    fn allowed_topic() -> Address {
        Address::topic(Entity::new("hvac", Some(1)), "temperature", None, Some("Temperature"))
    }

    fn denied_topic() -> Address {
        Address::topic(Entity::new("hvac", Some(1)), "diagnostics", None, Some("Trace"))
    }

    // =============================================================================
    // INTEGRATION TESTS: CONNECTOR DECISIONS
    // =============================================================================

    #[tokio::test]
    async fn test_connector_refusal_reaches_caller() {
        // Setup
        let connector = Arc::new(GatewayConnector::new([allowed_topic()]));
        let executor = Arc::new(CountingExecutor::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector.clone())
            .executor(executor.clone())
            .build()
            .unwrap();
        client.connect().await.unwrap();
        executor.idle().await;

        // Execute
        let allowed = client.register_listener(&allowed_topic(), Arc::new(RecordingListener::new()));
        let denied = client.register_listener(&denied_topic(), Arc::new(RecordingListener::new()));

        // Verify
        assert!(allowed.is_ok());
        assert_eq!(denied.unwrap_err().code, UCode::PERMISSION_DENIED);
        assert_eq!(client.listener_count(&denied_topic()), 0);
        assert_eq!(
            connector.calls(),
            vec![
                format!("enable {}", allowed_topic()),
                format!("enable {}", denied_topic()),
            ]
        );
    }

    #[tokio::test]
    async fn test_send_errors_pass_through() {
        let connector = Arc::new(GatewayConnector::new(Vec::new()));
        let executor = Arc::new(CountingExecutor::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector)
            .executor(executor)
            .build()
            .unwrap();
        client.connect().await.unwrap();

        let call = client.invoke_method(
            &Address::method(Entity::new("hvac", Some(1)), "SetTemperature"),
            bytes::Bytes::new(),
            ubus_types::CallOptions::default(),
        );

        assert_eq!(call.await.unwrap_err().code, UCode::UNIMPLEMENTED);
        assert_eq!(client.pending_call_count(), 0);
        assert_eq!(client.metrics().rpc_failed, 1);
    }

    #[tokio::test]
    async fn test_message_delivered_after_enable_returns() {
        // Setup: the gateway greets each new subscription from its own task
        let greeting = Message::new(
            Some(bytes::Bytes::from_static(b"21.5")),
            AttributesBuilder::publish(allowed_topic(), Priority::CS1).build(),
        );
        let connector =
            Arc::new(GatewayConnector::new([allowed_topic()]).with_greeting(greeting));
        let executor = Arc::new(CountingExecutor::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector.clone())
            .executor(executor.clone())
            .build()
            .unwrap();
        client.connect().await.unwrap();
        executor.idle().await;
        let listener = Arc::new(RecordingListener::new());

        // Execute
        client.register_listener(&allowed_topic(), listener.clone()).unwrap();
        connector.flush_greetings().await;
        executor.idle().await;

        // Verify
        assert_eq!(listener.count(), 1);
        assert_eq!(
            listener.last().map(|message| message.payload_or_empty()),
            Some(bytes::Bytes::from_static(b"21.5"))
        );
    }

    #[tokio::test]
    async fn test_last_listener_leaving_disables_once() {
        let connector = Arc::new(GatewayConnector::new([allowed_topic()]));
        let executor = Arc::new(CountingExecutor::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector.clone())
            .executor(executor)
            .build()
            .unwrap();
        client.connect().await.unwrap();
        let listener: Arc<dyn UListener> = Arc::new(RecordingListener::new());

        client.register_listener(&allowed_topic(), listener.clone()).unwrap();
        client.unregister_listener_everywhere(listener.clone()).unwrap();
        client.unregister_listener_everywhere(listener).unwrap();

        let disables = connector
            .calls()
            .iter()
            .filter(|call| call.starts_with("disable"))
            .count();
        assert_eq!(disables, 1);
    }
}
