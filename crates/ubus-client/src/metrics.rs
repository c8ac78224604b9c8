//! Client traffic counters.
//!
//! Thread-safe counters updated by the dispatcher and the RPC correlator.
//! Read them with [`ClientMetrics::snapshot`] or through
//! [`UBusClient::metrics`](crate::UBusClient::metrics).

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for a single client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Messages handed to the dispatcher by the connector
    pub messages_received: AtomicU64,
    /// Listener deliveries scheduled on the callback executor
    pub messages_delivered: AtomicU64,
    /// Inbound messages dropped (invalid, expired, unrouted)
    pub messages_dropped: AtomicU64,
    /// RPC requests accepted by the connector
    pub rpc_started: AtomicU64,
    /// Calls resolved with a response
    pub rpc_completed: AtomicU64,
    /// Calls failed by a comm-status or a send error
    pub rpc_failed: AtomicU64,
    /// Calls failed with DEADLINE_EXCEEDED
    pub rpc_timed_out: AtomicU64,
    /// Calls cancelled by the caller or by connection loss
    pub rpc_cancelled: AtomicU64,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, listeners: usize) {
        self.messages_delivered
            .fetch_add(listeners as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_started(&self) {
        self.rpc_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_completed(&self) {
        self.rpc_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_failed(&self) {
        self.rpc_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_timed_out(&self) {
        self.rpc_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_cancelled(&self) {
        self.rpc_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            rpc_started: self.rpc_started.load(Ordering::Relaxed),
            rpc_completed: self.rpc_completed.load(Ordering::Relaxed),
            rpc_failed: self.rpc_failed.load(Ordering::Relaxed),
            rpc_timed_out: self.rpc_timed_out.load(Ordering::Relaxed),
            rpc_cancelled: self.rpc_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub rpc_started: u64,
    pub rpc_completed: u64,
    pub rpc_failed: u64,
    pub rpc_timed_out: u64,
    pub rpc_cancelled: u64,
}

impl MetricsSnapshot {
    /// Calls that reached a terminal state.
    pub fn rpc_finished(&self) -> u64 {
        self.rpc_completed + self.rpc_failed + self.rpc_timed_out + self.rpc_cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = ClientMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_delivered(3);
        metrics.record_dropped();
        metrics.record_rpc_started();
        metrics.record_rpc_completed();
        metrics.record_rpc_timed_out();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.messages_delivered, 3);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.rpc_started, 1);
        assert_eq!(snapshot.rpc_finished(), 2);
    }
}
