//! Ports Layer
//!
//! - Driving Ports (inbound): the application-facing client API
//! - Driven Ports (outbound): the Bus Connector and application callbacks

pub mod inbound;
pub mod outbound;

pub use inbound::UClient;
pub use outbound::{BusConnector, ConnectionCallback, LifecycleListener, UListener};
