//! # RPC Correlator
//!
//! Issues outbound requests and ties inbound responses back to the calls
//! that are waiting for them.
//!
//! ## Flow
//!
//! 1. `invoke` validates its inputs and builds the request attributes
//! 2. The call is registered under its request id and fingerprint
//! 3. A timeout task is armed on the runtime
//! 4. The request is sent; a send failure discards the call
//! 5. A response, the timeout, caller cancellation or connection loss
//!    finishes the call, whichever comes first

use crate::domain::{PendingCallStore, RpcCall, Termination};
use crate::metrics::ClientMetrics;
use crate::ports::BusConnector;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use ubus_types::{Address, AttributesBuilder, CallOptions, Message, UCode, UStatus};

/// Correlates RPC requests with responses.
pub struct RpcCorrelator {
    connector: Arc<dyn BusConnector>,
    reply_address: Address,
    store: Arc<PendingCallStore>,
    runtime: Handle,
    default_timeout: Duration,
    metrics: Arc<ClientMetrics>,
}

impl RpcCorrelator {
    pub fn new(
        connector: Arc<dyn BusConnector>,
        reply_address: Address,
        runtime: Handle,
        default_timeout: Duration,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self {
            connector,
            reply_address,
            store: Arc::new(PendingCallStore::new(metrics.clone())),
            runtime,
            default_timeout,
            metrics,
        }
    }

    /// Send a request to `method` and return the call awaiting its response.
    pub fn invoke(&self, method: &Address, payload: Bytes, options: CallOptions) -> RpcCall {
        if method.is_empty() {
            return RpcCall::rejected(UStatus::invalid_argument("Method address must not be empty"));
        }
        if !method.is_method() {
            return RpcCall::rejected(UStatus::invalid_argument(format!(
                "{method} is not a method address"
            )));
        }
        if !options.priority.is_rpc_capable() {
            return RpcCall::rejected(UStatus::invalid_argument(format!(
                "Priority {:?} is below the RPC minimum",
                options.priority
            )));
        }

        let mut builder = AttributesBuilder::request(
            self.reply_address.clone(),
            method.clone(),
            options.priority,
            options.ttl,
        );
        if let Some(token) = options.token {
            builder = builder.with_token(token);
        }
        let fingerprint = builder.fingerprint();
        let attributes = builder.build();
        let id = attributes.id;

        let receiver = match self.store.register(id, fingerprint, method.clone()) {
            Ok(receiver) => receiver,
            Err(status) => return RpcCall::rejected(status),
        };

        let timeout = if options.ttl.is_zero() {
            self.default_timeout
        } else {
            options.ttl
        };
        self.arm_timer(id, timeout);

        if let Err(status) = self.connector.send(Message::new(Some(payload), attributes)) {
            warn!(request_id = %id, method = %method, code = %status.code, "Request send failed");
            self.store.discard(&id);
            self.metrics.record_rpc_failed();
            return RpcCall::rejected(status);
        }

        self.metrics.record_rpc_started();
        debug!(
            request_id = %id,
            method = %method,
            timeout_ms = timeout.as_millis() as u64,
            "Request sent"
        );
        RpcCall::pending(id, receiver, Arc::downgrade(&self.store))
    }

    /// Finish the call a response answers. Returns false if no call matched.
    pub fn handle_response(&self, response: Message) -> bool {
        let Some((request_id, commstatus)) = response
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.reqid.map(|reqid| (reqid, attributes.commstatus)))
        else {
            return false;
        };

        let (outcome, termination) = match commstatus {
            Some(code) if !code.is_ok() => (
                Err(UStatus::fail_with_code(code, "Responder reported failure")),
                Termination::Failed,
            ),
            _ => (Ok(response), Termination::Completed),
        };

        let matched = self.store.finish(&request_id, outcome, termination);
        if !matched {
            debug!(request_id = %request_id, "Response matches no pending call, dropping");
        }
        matched
    }

    /// Fail every outstanding call with `CANCELLED`.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let cancelled = self.store.cancel_all(reason);
        if cancelled > 0 {
            debug!(cancelled, reason, "Cancelled outstanding calls");
        }
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.store.pending_count()
    }

    pub fn reply_address(&self) -> &Address {
        &self.reply_address
    }

    fn arm_timer(&self, id: ubus_types::MessageId, timeout: Duration) {
        let store = Arc::downgrade(&self.store);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(store) = store.upgrade() {
                let expired = store.finish(
                    &id,
                    Err(UStatus::fail_with_code(
                        UCode::DEADLINE_EXCEEDED,
                        format!("No response within {} ms", timeout.as_millis()),
                    )),
                    Termination::TimedOut,
                );
                if expired {
                    warn!(request_id = %id, "Request timed out");
                }
            }
        });
        self.store.arm_timer(&id, task.abort_handle());
    }
}
