//! Domain Layer
//!
//! Client-side state with no transport knowledge: connection state,
//! pending RPC calls and the call handle applications await.

pub mod call;
pub mod pending;
pub mod state;

pub use call::{CallState, RpcCall};
pub use pending::{CallOutcome, Fingerprint, PendingCallStore, Termination};
pub use state::{ConnectionState, ConnectionStateCell};
