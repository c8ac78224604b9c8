//! Adapters Layer
//!
//! Concrete Bus Connector implementations.

pub mod loopback;

pub use loopback::{DispatchCounters, LoopbackConnector};
