//! Service Layer
//!
//! The client's moving parts and the [`UBusClient`] that wires them together.

pub mod client;
pub mod correlator;
pub mod dispatcher;
pub mod lifecycle;
pub mod registry;

pub use client::{ClientBuilder, UBusClient};
pub use correlator::RpcCorrelator;
pub use dispatcher::MessageDispatcher;
pub use lifecycle::LifecycleCoordinator;
pub use registry::{ListenerHandle, ListenerRegistry, Registration};
