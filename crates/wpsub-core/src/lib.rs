//! wpsub core: transport-agnostic protocol primitives, auth and error types.
//!
//! This crate defines the CloudEvents webhook contract, the connection
//! descriptor, token signing and the error surface shared by the webhook
//! receiver and the outbound REST client. It intentionally carries no HTTP
//! runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Outside tests, panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `WpsError`/`Result` so a malformed
//! webhook request never takes the receiver down.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, WpsError};
pub use endpoint::ConnectionDescriptor;
