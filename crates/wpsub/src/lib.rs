//! Top-level facade crate for wpsub.
//!
//! Re-exports the core primitives, the inbound webhook library and the
//! outbound management client so users can depend on a single crate.

pub mod core {
    pub use wpsub_core::*;
}

pub mod webhook {
    pub use wpsub_webhook::*;
}

pub mod client {
    pub use wpsub_client::*;
}

pub use wpsub_core::{Result, WpsError};
