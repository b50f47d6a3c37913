//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and handler traits so applications can depend on
//! this module directly.

pub mod dispatcher;

pub use dispatcher::{
    ConnectHandler, ConnectedHandler, DisconnectedHandler, Dispatched, Dispatcher,
    UserEventHandler, ANY_USER_EVENT,
};
