//! Test helpers shared by unit tests, the crate's integration tests and
//! downstream crates (enable the `test-utils` feature).

use crate::executor::{CallbackExecutor, SerialExecutor};
use crate::ports::{LifecycleListener, UListener};
use crate::service::UBusClient;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use ubus_types::Message;

/// Listener that records every message it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    received: Mutex<Vec<Message>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.received.lock().last().cloned()
    }
}

impl UListener for RecordingListener {
    fn on_receive(&self, message: Message) {
        self.received.lock().push(message);
    }
}

/// Lifecycle listener that records every `ready` flag it is told.
#[derive(Debug, Default)]
pub struct RecordingLifecycleListener {
    events: Mutex<Vec<bool>>,
}

impl RecordingLifecycleListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<bool> {
        self.events.lock().clone()
    }
}

impl LifecycleListener for RecordingLifecycleListener {
    fn on_lifecycle_changed(&self, _client: &UBusClient, ready: bool) {
        self.events.lock().push(ready);
    }
}

/// Serial executor that counts how many tasks were submitted.
pub struct CountingExecutor {
    inner: SerialExecutor,
    submitted: AtomicUsize,
}

impl CountingExecutor {
    /// Build on the current tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(&Handle::current())
    }

    pub fn with_handle(handle: &Handle) -> Self {
        Self {
            inner: SerialExecutor::new(handle),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Wait until every task submitted so far has run.
    pub async fn idle(&self) {
        self.inner.idle().await;
    }
}

impl Default for CountingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackExecutor for CountingExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(task);
    }
}
