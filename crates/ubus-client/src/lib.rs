//! # uBus Client
//!
//! Client-side logic for endpoints on a shared message bus: topic
//! publish/receive, request handlers and request/response calls, layered on
//! an external Bus Connector.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): connection state, pending calls, the
//!   [`RpcCall`] handle
//! - **Ports Layer** (`ports/`): [`UClient`] (driving), [`BusConnector`] and
//!   the application callbacks (driven)
//! - **Service Layer** (`service/`):
//!   - `ListenerRegistry`: ref-counted address → listeners map
//!   - `MessageDispatcher`: validates and routes inbound messages
//!   - `RpcCorrelator`: outbound requests and their responses
//!   - `LifecycleCoordinator`: reacts to connector state callbacks
//!   - [`UBusClient`]: wires it all to one connector
//! - **Adapters Layer** (`adapters/`): [`LoopbackConnector`]
//!
//! ## Invariants
//!
//! - A connector address is enabled once for its first listener and
//!   disabled once after its last.
//! - A method address has at most one listener.
//! - A pending call finishes exactly once.
//! - Expired or malformed inbound messages never reach a listener.
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ubus_client::{LoopbackConnector, UBusClient, UClient};
//! use ubus_types::{Address, CallOptions, Entity};
//!
//! let connector = Arc::new(LoopbackConnector::new());
//! let client = UBusClient::builder(Address::entity("dashboard", 1), connector).build()?;
//! client.connect().await?;
//!
//! let method = Address::method(Entity::new("hvac", Some(1)), "SetTemperature");
//! let response = client.invoke_method(&method, payload, CallOptions::default()).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{DispatchCounters, LoopbackConnector};
pub use config::{CallbackMode, ClientConfig};
pub use domain::{CallState, ConnectionState, RpcCall};
pub use error::ConfigError;
pub use executor::{CallbackExecutor, PooledExecutor, SerialExecutor};
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use ports::{BusConnector, ConnectionCallback, LifecycleListener, UClient, UListener};
pub use service::{ClientBuilder, UBusClient};
