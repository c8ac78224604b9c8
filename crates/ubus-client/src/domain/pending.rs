//! Pending Call Store
//!
//! Maps outstanding request ids to the oneshot senders of their waiting
//! [`RpcCall`](crate::domain::RpcCall)s. A second index keyed by the request
//! fingerprint rejects duplicate in-flight calls.
//!
//! Every terminal path (response, timeout, cancellation, connection loss,
//! send failure) goes through a single `DashMap::remove`, so a call is
//! finished at most once no matter how those paths race.

use crate::metrics::ClientMetrics;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, warn};
use ubus_types::{Address, Message, MessageId, Priority, UCode, UStatus};

/// Outcome delivered to a waiting call.
pub type CallOutcome = Result<Message, UStatus>;

/// Request attributes that identify an in-flight call: `(source, sink, priority, ttl)`.
pub type Fingerprint = (Address, Option<Address>, Priority, Option<Duration>);

/// How a pending call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

struct PendingCall {
    sender: oneshot::Sender<CallOutcome>,
    fingerprint: Fingerprint,
    method: Address,
    created_at: Instant,
    timer: Option<AbortHandle>,
}

/// Outstanding RPC calls indexed by request id and by fingerprint.
pub struct PendingCallStore {
    calls: DashMap<MessageId, PendingCall>,
    fingerprints: DashMap<Fingerprint, MessageId>,
    metrics: Arc<ClientMetrics>,
}

impl PendingCallStore {
    pub fn new(metrics: Arc<ClientMetrics>) -> Self {
        Self {
            calls: DashMap::new(),
            fingerprints: DashMap::new(),
            metrics,
        }
    }

    /// Track a call and get the receiver its outcome will arrive on.
    ///
    /// Fails with `ABORTED` when a call with the same fingerprint is in flight.
    pub fn register(
        &self,
        id: MessageId,
        fingerprint: Fingerprint,
        method: Address,
    ) -> Result<oneshot::Receiver<CallOutcome>, UStatus> {
        match self.fingerprints.entry(fingerprint.clone()) {
            Entry::Occupied(existing) => {
                warn!(
                    request_id = %id,
                    in_flight = %existing.get(),
                    method = %method,
                    "Duplicate in-flight request"
                );
                return Err(UStatus::fail_with_code(
                    UCode::ABORTED,
                    format!("Duplicate request for {method}"),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let (sender, receiver) = oneshot::channel();
        self.calls.insert(
            id,
            PendingCall {
                sender,
                fingerprint,
                method,
                created_at: Instant::now(),
                timer: None,
            },
        );
        debug!(request_id = %id, "Registered pending call");
        Ok(receiver)
    }

    /// Attach the timeout task of a call. Returns false if the call already ended.
    pub fn arm_timer(&self, id: &MessageId, timer: AbortHandle) -> bool {
        match self.calls.get_mut(id) {
            Some(mut call) => {
                call.timer = Some(timer);
                true
            }
            None => {
                timer.abort();
                false
            }
        }
    }

    /// Finish a call with `outcome`. Returns false if it was not pending.
    pub fn finish(&self, id: &MessageId, outcome: CallOutcome, termination: Termination) -> bool {
        let Some(call) = self.take(id) else {
            return false;
        };
        match termination {
            Termination::Completed => self.metrics.record_rpc_completed(),
            Termination::Failed => self.metrics.record_rpc_failed(),
            Termination::TimedOut => self.metrics.record_rpc_timed_out(),
            Termination::Cancelled => self.metrics.record_rpc_cancelled(),
        }
        debug!(
            request_id = %id,
            method = %call.method,
            outcome = ?termination,
            elapsed_ms = call.created_at.elapsed().as_millis() as u64,
            "Pending call finished"
        );
        if call.sender.send(outcome).is_err() {
            debug!(request_id = %id, "Call handle dropped before outcome");
        }
        true
    }

    /// Remove a call without delivering an outcome.
    pub fn discard(&self, id: &MessageId) -> bool {
        self.take(id).is_some()
    }

    /// Fail every outstanding call with `CANCELLED`. Returns how many were failed.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let ids: Vec<MessageId> = self.calls.iter().map(|entry| *entry.key()).collect();
        ids.iter()
            .filter(|id| {
                self.finish(
                    id,
                    Err(UStatus::fail_with_code(UCode::CANCELLED, reason)),
                    Termination::Cancelled,
                )
            })
            .count()
    }

    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.calls.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.calls.len()
    }

    fn take(&self, id: &MessageId) -> Option<PendingCall> {
        let (_, call) = self.calls.remove(id)?;
        self.fingerprints
            .remove_if(&call.fingerprint, |_, owner| owner == id);
        if let Some(timer) = &call.timer {
            timer.abort();
        }
        Some(call)
    }
}
