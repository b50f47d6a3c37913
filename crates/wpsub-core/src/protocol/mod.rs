//! Webhook protocol modules (CloudEvents over HTTP).
//!
//! Decode-once pipeline:
//! - `envelope`: raw headers + body -> `EventEnvelope` -> `CloudEvent` attributes
//!   (binary content mode and structured `application/cloudevents+json`).
//! - `event`: `CloudEvent` -> closed `InboundEvent` sum type (or PassThrough).
//! - `response`: handler outcome -> status/content-type/body triple.
//!
//! All parsers are panic-free: malformed input is reported as `WpsError`
//! instead of panicking, so one bad request never affects another.

pub mod envelope;
pub mod event;
pub mod response;

pub use envelope::{CloudEvent, EventEnvelope, RawData};
pub use event::{
    classify, decode, decode_route, ClientCertificate, ConnectRequest, ConnectedRequest, Context,
    Decoded, DisconnectedRequest, EventKind, InboundEvent, Route, UserEventRequest,
};
pub use response::{ConnectResponse, DataType, ErrorCode, HandlerResult, Payload, WebhookResponse};
