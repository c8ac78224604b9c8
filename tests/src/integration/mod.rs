//! Cross-crate integration tests.

pub mod custom_connector;
pub mod e2e_loopback;
