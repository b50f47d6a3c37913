//! wpsub client: outbound management calls to the pub/sub service.
//!
//! - `rest`: signed HTTP transport and status interpretation
//! - `permissions`: grant / revoke / check connection permissions
//! - `service`: hub-scoped broadcast, targeted send, membership and client tokens
//!
//! Unexpected statuses surface as `WpsError::UnexpectedStatus` so callers can
//! decide whether to retry.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod permissions;
pub mod rest;
pub mod service;

pub use permissions::{Permission, PermissionClient, PermissionGrant};
pub use rest::{RestClient, RestRequest, RestResponse, API_VERSION};
pub use service::{ClientAccess, ClientAccessOptions, Message, ServiceClient};
