//! Typed inbound events.
//!
//! Decoding rules:
//! - hub mismatch (or missing hub) => `Decoded::PassThrough`, nothing else is inspected
//! - event type is compared lower-cased; the `azure.webpubsub.` prefix is optional
//! - `sys.connect` / `sys.connected` / `sys.disconnected` / `user.*`, anything else is
//!   `UnsupportedEvent`
//! - user events need exactly one data encoding, otherwise `MalformedEvent`
//!
//! `classify` reads only hub and type, so callers can act on the event kind
//! before the payload or connection context is validated by `decode_route`.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::Deserialize;

use crate::auth::ClaimMap;
use crate::error::{Result, WpsError};

use super::envelope::{CloudEvent, EventEnvelope, RawData};
use super::response::DataType;

/// Namespace every service event type lives under.
pub const EVENT_TYPE_PREFIX: &str = "azure.webpubsub.";

/// Metadata common to every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub hub: String,
    pub connection_id: String,
    pub user_id: Option<String>,
    pub event_name: String,
    pub signature: Vec<String>,
    pub request_host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCertificate {
    pub thumbprint: String,
}

/// Handshake request; the handler decides accept/reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub context: Context,
    pub claims: ClaimMap,
    pub queries: ClaimMap,
    pub subprotocols: Vec<String>,
    pub client_certificates: Vec<ClientCertificate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedRequest {
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedRequest {
    pub context: Context,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEventRequest {
    pub context: Context,
    pub data: Bytes,
    pub data_type: DataType,
}

impl UserEventRequest {
    /// Data as UTF-8 text, if it is.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Closed set of events the service pushes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Connect(ConnectRequest),
    Connected(ConnectedRequest),
    Disconnected(DisconnectedRequest),
    User(UserEventRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Connected,
    Disconnected,
    User,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::User => "user",
        }
    }
}

impl InboundEvent {
    pub fn context(&self) -> &Context {
        match self {
            InboundEvent::Connect(r) => &r.context,
            InboundEvent::Connected(r) => &r.context,
            InboundEvent::Disconnected(r) => &r.context,
            InboundEvent::User(r) => &r.context,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::Connect(_) => EventKind::Connect,
            InboundEvent::Connected(_) => EventKind::Connected,
            InboundEvent::Disconnected(_) => EventKind::Disconnected,
            InboundEvent::User(_) => EventKind::User,
        }
    }
}

/// Parser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Event(InboundEvent),
    /// Not addressed to this hub; route it elsewhere.
    PassThrough,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConnectBody {
    claims: ClaimMap,
    queries: ClaimMap,
    subprotocols: Vec<String>,
    client_certificates: Vec<ClientCertificate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DisconnectedBody {
    reason: Option<String>,
}

/// Where an event goes, resolved from the CloudEvent attributes alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: EventKind,
    /// `ce-eventname` when present, otherwise derived from the type.
    /// User events keep the sender's casing.
    pub event_name: String,
}

/// Decode one envelope for a dispatcher bound to `hub`.
pub fn decode(envelope: &EventEnvelope, hub: &str) -> Result<Decoded> {
    let ce = envelope.cloud_event()?;
    match classify(&ce, hub)? {
        Some(route) => decode_route(&ce, envelope, hub, &route).map(Decoded::Event),
        None => Ok(Decoded::PassThrough),
    }
}

/// Resolve hub and event type without touching the payload or the
/// connection context. `None` means the event belongs to another hub.
pub fn classify(ce: &CloudEvent, hub: &str) -> Result<Option<Route>> {
    if ce.hub.as_deref() != Some(hub) {
        tracing::trace!(expected = hub, got = ?ce.hub, "event for another hub");
        return Ok(None);
    }

    let raw_type = ce
        .event_type
        .as_deref()
        .ok_or_else(|| WpsError::MalformedEvent("missing event type".into()))?;
    let lowered = raw_type.to_ascii_lowercase();
    let short = lowered.strip_prefix(EVENT_TYPE_PREFIX).unwrap_or(&lowered);

    let (kind, derived) = match short {
        "sys.connect" => (EventKind::Connect, "connect"),
        "sys.connected" => (EventKind::Connected, "connected"),
        "sys.disconnected" => (EventKind::Disconnected, "disconnected"),
        user if user.starts_with("user.") => {
            // event name keeps the sender's casing
            let name = raw_type
                .get(raw_type.len() - (user.len() - "user.".len())..)
                .unwrap_or_default();
            (EventKind::User, name)
        }
        _ => return Err(WpsError::UnsupportedEvent(raw_type.to_string())),
    };

    Ok(Some(Route {
        kind,
        event_name: ce
            .event_name
            .clone()
            .unwrap_or_else(|| derived.to_string()),
    }))
}

/// Build the typed event for an already classified CloudEvent.
pub fn decode_route(
    ce: &CloudEvent,
    envelope: &EventEnvelope,
    hub: &str,
    route: &Route,
) -> Result<InboundEvent> {
    let context = build_context(ce, envelope, hub, &route.event_name)?;

    Ok(match route.kind {
        EventKind::Connect => {
            let body: ConnectBody = json_body(ce)?;
            InboundEvent::Connect(ConnectRequest {
                context,
                claims: body.claims,
                queries: body.queries,
                subprotocols: body.subprotocols,
                client_certificates: body.client_certificates,
            })
        }
        EventKind::Connected => InboundEvent::Connected(ConnectedRequest { context }),
        EventKind::Disconnected => {
            let body: DisconnectedBody = json_body(ce)?;
            InboundEvent::Disconnected(DisconnectedRequest {
                context,
                reason: body.reason,
            })
        }
        EventKind::User => {
            let (data, data_type) = user_data(ce)?;
            InboundEvent::User(UserEventRequest {
                context,
                data,
                data_type,
            })
        }
    })
}

fn build_context(
    ce: &CloudEvent,
    envelope: &EventEnvelope,
    hub: &str,
    event_name: &str,
) -> Result<Context> {
    let connection_id = ce
        .connection_id
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| WpsError::MalformedEvent("missing connection id".into()))?;

    let signature = ce
        .signature
        .as_deref()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Context {
        hub: hub.to_string(),
        connection_id,
        user_id: ce.user_id.clone().filter(|u| !u.is_empty()),
        event_name: event_name.to_string(),
        signature,
        request_host: envelope.header("host").unwrap_or_default().to_string(),
    })
}

/// System event bodies are JSON objects; an empty body means `{}`.
fn json_body<T: for<'de> Deserialize<'de> + Default>(ce: &CloudEvent) -> Result<T> {
    let bytes = match &ce.data {
        None => return Ok(T::default()),
        Some(RawData::Inline(b)) => b.clone(),
        Some(RawData::Base64(s)) => Bytes::from(decode_base64(s)?),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| WpsError::MalformedEvent(format!("invalid event body: {e}")))
}

fn user_data(ce: &CloudEvent) -> Result<(Bytes, DataType)> {
    match &ce.data {
        Some(RawData::Inline(b)) if !b.is_empty() => {
            let data_type = match ce.data_content_type.as_deref() {
                Some("application/json") => DataType::Json,
                Some("application/octet-stream") => DataType::Binary,
                _ => DataType::Text,
            };
            Ok((b.clone(), data_type))
        }
        Some(RawData::Base64(s)) => Ok((Bytes::from(decode_base64(s)?), DataType::Binary)),
        _ => Err(WpsError::MalformedEvent("empty data payload".into())),
    }
}

fn decode_base64(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s.trim())
        .map_err(|e| WpsError::MalformedEvent(format!("invalid data_base64: {e}")))
}
