//! # uBus Test Suite
//!
//! Unified test crate for flows that span the client crates.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # End-to-end flows over the loopback connector
//!     ├── e2e_loopback.rs
//!     └── custom_connector.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ubus-tests
//!
//! # By category
//! cargo test -p ubus-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
