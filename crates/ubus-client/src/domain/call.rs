//! RPC call handle.
//!
//! [`RpcCall`] is the future returned by `invoke_method`. It is a tagged,
//! single-resolution handle: once it leaves `Pending` it never changes again,
//! whichever of response, timeout, cancellation or connection loss wins.

use crate::domain::pending::{CallOutcome, PendingCallStore, Termination};
use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::sync::oneshot::{self, error::TryRecvError};
use ubus_types::{Message, MessageId, UCode, UStatus};

/// Observable state of an [`RpcCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Sent and waiting for an outcome.
    Pending,
    /// A response arrived.
    Resolved,
    /// Failed before anything was sent (bad arguments, duplicate, send error).
    Rejected,
    /// Failed after sending (comm-status, timeout, cancellation, connection loss).
    Failed,
    /// The outcome was already taken by awaiting the call.
    Consumed,
}

enum Inner {
    Pending(oneshot::Receiver<CallOutcome>),
    Resolved(Message),
    Rejected(UStatus),
    Failed(UStatus),
    Consumed,
}

/// Future of an outbound RPC call.
///
/// Dropping or [cancelling](RpcCall::cancel) an unresolved call removes its
/// pending entry; nothing is sent to the responder.
#[must_use = "dropping an RpcCall cancels it"]
pub struct RpcCall {
    request_id: Option<MessageId>,
    inner: Inner,
    store: Weak<PendingCallStore>,
}

impl RpcCall {
    pub(crate) fn pending(
        request_id: MessageId,
        receiver: oneshot::Receiver<CallOutcome>,
        store: Weak<PendingCallStore>,
    ) -> Self {
        Self {
            request_id: Some(request_id),
            inner: Inner::Pending(receiver),
            store,
        }
    }

    /// A call that failed before anything was sent.
    pub fn rejected(status: UStatus) -> Self {
        Self {
            request_id: None,
            inner: Inner::Rejected(status),
            store: Weak::new(),
        }
    }

    /// Id of the request message, if one was built and sent.
    pub fn request_id(&self) -> Option<MessageId> {
        self.request_id
    }

    /// Current state, picking up an outcome that arrived since the last check.
    pub fn state(&mut self) -> CallState {
        if let Inner::Pending(receiver) = &mut self.inner {
            match receiver.try_recv() {
                Ok(Ok(message)) => self.inner = Inner::Resolved(message),
                Ok(Err(status)) => self.inner = Inner::Failed(status),
                Err(TryRecvError::Closed) => self.inner = Inner::Failed(closed()),
                Err(TryRecvError::Empty) => {}
            }
        }
        match self.inner {
            Inner::Pending(_) => CallState::Pending,
            Inner::Resolved(_) => CallState::Resolved,
            Inner::Rejected(_) => CallState::Rejected,
            Inner::Failed(_) => CallState::Failed,
            Inner::Consumed => CallState::Consumed,
        }
    }

    /// True once the call has an outcome.
    pub fn is_done(&mut self) -> bool {
        self.state() != CallState::Pending
    }

    /// Cancel a pending call. Returns false if it already had an outcome.
    pub fn cancel(&mut self) -> bool {
        if self.state() != CallState::Pending {
            return false;
        }
        self.release();
        self.inner = Inner::Failed(UStatus::fail_with_code(UCode::CANCELLED, "Call cancelled"));
        true
    }

    fn release(&self) {
        if let (Some(id), Some(store)) = (self.request_id, self.store.upgrade()) {
            store.finish(
                &id,
                Err(UStatus::fail_with_code(UCode::CANCELLED, "Call cancelled")),
                Termination::Cancelled,
            );
        }
    }
}

impl Future for RpcCall {
    type Output = Result<Message, UStatus>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.inner, Inner::Consumed) {
            Inner::Pending(mut receiver) => match Pin::new(&mut receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_)) => Poll::Ready(Err(closed())),
                Poll::Pending => {
                    this.inner = Inner::Pending(receiver);
                    Poll::Pending
                }
            },
            Inner::Resolved(message) => Poll::Ready(Ok(message)),
            Inner::Rejected(status) | Inner::Failed(status) => Poll::Ready(Err(status)),
            Inner::Consumed => Poll::Ready(Err(UStatus::fail_with_code(
                UCode::FAILED_PRECONDITION,
                "Call outcome already taken",
            ))),
        }
    }
}

impl Drop for RpcCall {
    fn drop(&mut self) {
        if matches!(self.inner, Inner::Pending(_)) {
            self.release();
        }
    }
}

impl std::fmt::Debug for RpcCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.inner {
            Inner::Pending(_) => "Pending",
            Inner::Resolved(_) => "Resolved",
            Inner::Rejected(_) => "Rejected",
            Inner::Failed(_) => "Failed",
            Inner::Consumed => "Consumed",
        };
        f.debug_struct("RpcCall")
            .field("request_id", &self.request_id)
            .field("state", &state)
            .finish()
    }
}

fn closed() -> UStatus {
    UStatus::fail_with_code(UCode::CANCELLED, "Client dropped")
}
