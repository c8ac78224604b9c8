//! # End-to-End Loopback Flows
//!
//! One client plays both sides of a door-control service on the loopback
//! bus: it serves a method, publishes the resulting state change and calls
//! the method the way a dashboard would.
//!
//! ## Flows Tested:
//!
//! 1. **Command round trip**: request, handler side effect, response
//! 2. **Late subscriber**: retained state replayed to a new listener
//! 3. **Reconnect**: registrations restored after an interruption
//! 4. **Pooled callbacks**: the same flow on the pooled executor

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use ubus_client::test_utils::{CountingExecutor, RecordingListener};
    use ubus_client::{
        CallbackMode, ClientConfig, LoopbackConnector, UBusClient, UClient, UListener,
    };
    use ubus_telemetry::{init_logging, TelemetryConfig};
    use ubus_types::{
        Address, AttributesBuilder, CallOptions, Entity, Message, Priority, UCode,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn door_service() -> Entity {
        Entity::new("body.access", Some(1))
    }

    fn door_topic() -> Address {
        Address::topic(door_service(), "door", Some("front_left"), Some("Door"))
    }

    fn update_door() -> Address {
        Address::method(door_service(), "UpdateDoor")
    }

    fn init_test_logging() {
        // Another test may already own the global subscriber.
        let _ = init_logging(TelemetryConfig::default().with_log_level("debug"));
    }

    /// Handler for `UpdateDoor`: publishes the new door state, then answers.
    fn door_handler(client: &UBusClient) -> Arc<dyn UListener> {
        let client = client.clone();
        Arc::new(move |request: Message| {
            let Some(attributes) = request.attributes.as_ref() else {
                return;
            };
            let command = request.payload_or_empty();
            let state = Message::new(
                Some(command.clone()),
                AttributesBuilder::publish(door_topic(), Priority::CS1).build(),
            );
            let status = match client.send(state) {
                Ok(()) => UCode::OK,
                Err(status) => status.code,
            };
            let response = Message::new(
                Some(command),
                AttributesBuilder::response(attributes)
                    .with_commstatus(status)
                    .build(),
            );
            let _ = client.send(response);
        })
    }

    /// Listener forwarding payloads into a channel, for executors without an idle barrier.
    fn channel_listener() -> (Arc<dyn UListener>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn UListener> = Arc::new(move |message: Message| {
            let _ = tx.send(message.payload_or_empty());
        });
        (listener, rx)
    }

    struct Harness {
        connector: Arc<LoopbackConnector>,
        executor: Arc<CountingExecutor>,
        client: UBusClient,
    }

    async fn connected_harness() -> Harness {
        init_test_logging();
        let connector = Arc::new(LoopbackConnector::new());
        let executor = Arc::new(CountingExecutor::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector.clone())
            .executor(executor.clone())
            .build()
            .expect("client builds");
        client.connect().await.expect("loopback connects");
        executor.idle().await;
        Harness {
            connector,
            executor,
            client,
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: COMMAND ROUND TRIP
    // =============================================================================

    #[tokio::test]
    async fn test_command_round_trip_publishes_state() {
        // Setup: serve the method and watch the topic
        let harness = connected_harness().await;
        let watcher = Arc::new(RecordingListener::new());
        harness
            .client
            .register_listener(&update_door(), door_handler(&harness.client))
            .unwrap();
        harness
            .client
            .register_listener(&door_topic(), watcher.clone())
            .unwrap();

        // Execute: call the method as a dashboard would
        let response = timeout(
            Duration::from_secs(2),
            harness.client.invoke_method(
                &update_door(),
                Bytes::from_static(b"open"),
                CallOptions::default(),
            ),
        )
        .await
        .expect("response before deadline")
        .expect("call succeeds");
        harness.executor.idle().await;

        // Verify: response and side effect
        assert_eq!(response.payload_or_empty(), Bytes::from_static(b"open"));
        assert_eq!(watcher.count(), 1);
        let metrics = harness.client.metrics();
        assert_eq!(metrics.rpc_completed, 1);
        assert_eq!(harness.client.pending_call_count(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_state() {
        let harness = connected_harness().await;
        let first = Arc::new(RecordingListener::new());
        harness
            .client
            .register_listener(&update_door(), door_handler(&harness.client))
            .unwrap();
        harness
            .client
            .register_listener(&door_topic(), first.clone())
            .unwrap();

        harness
            .client
            .invoke_method(&update_door(), Bytes::from_static(b"closed"), CallOptions::default())
            .await
            .unwrap();

        let late = Arc::new(RecordingListener::new());
        harness
            .client
            .register_listener(&door_topic(), late.clone())
            .unwrap();
        harness.executor.idle().await;

        assert_eq!(
            late.last().map(|message| message.payload_or_empty()),
            Some(Bytes::from_static(b"closed"))
        );
        assert_eq!(first.count(), 1);
    }

    // =============================================================================
    // INTEGRATION TESTS: CONNECTION LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_calls_work_again_after_reconnect() {
        let harness = connected_harness().await;
        harness
            .client
            .register_listener(&update_door(), door_handler(&harness.client))
            .unwrap();

        let in_flight = harness.client.invoke_method(
            &Address::method(Entity::new("hvac", Some(1)), "SetTemperature"),
            Bytes::new(),
            CallOptions::default(),
        );
        harness.connector.interrupt();
        assert_eq!(in_flight.await.unwrap_err().code, UCode::CANCELLED);

        harness.client.connect().await.unwrap();
        harness.executor.idle().await;

        let response = harness
            .client
            .invoke_method(&update_door(), Bytes::from_static(b"open"), CallOptions::default())
            .await
            .unwrap();
        assert_eq!(response.payload_or_empty(), Bytes::from_static(b"open"));
        assert_eq!(harness.connector.counters(&update_door()).enable, 2);
    }

    // =============================================================================
    // INTEGRATION TESTS: POOLED CALLBACKS
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pooled_executor_round_trip() {
        init_test_logging();
        let connector = Arc::new(LoopbackConnector::new());
        let client = UBusClient::builder(Address::entity("dashboard", 1), connector.clone())
            .config(ClientConfig::default().with_callback_mode(CallbackMode::Pooled))
            .build()
            .unwrap();
        client.connect().await.unwrap();

        let (listener, mut updates) = channel_listener();
        client
            .register_listener(&update_door(), door_handler(&client))
            .unwrap();
        client.register_listener(&door_topic(), listener).unwrap();

        let response = timeout(
            Duration::from_secs(2),
            client.invoke_method(&update_door(), Bytes::from_static(b"open"), CallOptions::default()),
        )
        .await
        .expect("response before deadline")
        .unwrap();
        let update = timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("update before deadline");

        assert_eq!(response.payload_or_empty(), Bytes::from_static(b"open"));
        assert_eq!(update, Some(Bytes::from_static(b"open")));
    }
}
