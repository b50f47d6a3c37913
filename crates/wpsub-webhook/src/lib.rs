//! wpsub webhook library entry.
//!
//! Wires config, origin allow-list, dispatcher and built-in services into an
//! axum router. Consumed by the binary (`main.rs`) and by integration tests.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod ops;
pub mod policy;
pub mod router;
pub mod services;
pub mod transport;
