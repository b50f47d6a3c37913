//! Transport layer (HTTP webhook).
//!
//! Binds the inbound route to axum: `POST` carries events into the dispatcher,
//! `OPTIONS` answers the abuse-protection probe.

pub mod http;
pub mod preflight;
