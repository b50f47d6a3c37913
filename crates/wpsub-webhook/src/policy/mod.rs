//! Policy layer (abuse-protection origin allow-list).
//!
//! Compiles configured endpoints once at startup into the origin list echoed
//! back during the service's webhook validation handshake.

pub mod allowlist;

pub use allowlist::AllowedOrigins;
