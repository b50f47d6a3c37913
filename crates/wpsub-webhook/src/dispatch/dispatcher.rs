use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;

use wpsub_core::error::{Result, WpsError};
use wpsub_core::protocol::{
    classify, decode_route, ConnectRequest, ConnectResponse, ConnectedRequest,
    DisconnectedRequest, ErrorCode, EventEnvelope, EventKind, HandlerResult, InboundEvent, Payload,
    Route, UserEventRequest, WebhookResponse,
};

/// Catch-all key for user event handlers.
pub const ANY_USER_EVENT: &str = "*";

/// Decides whether a handshake is accepted. `Err(WpsError::HandlerFailure)` rejects.
#[async_trait]
pub trait ConnectHandler: Send + Sync {
    async fn handle_connect(&self, req: ConnectRequest) -> Result<ConnectResponse>;
}

/// Notified after a connection is established. Reply is not meaningful to the service.
#[async_trait]
pub trait ConnectedHandler: Send + Sync {
    async fn on_connected(&self, req: ConnectedRequest) -> Result<()>;
}

/// Notified after a connection is gone.
#[async_trait]
pub trait DisconnectedHandler: Send + Sync {
    async fn on_disconnected(&self, req: DisconnectedRequest) -> Result<()>;
}

/// Handles `user.<event>` messages. `Ok(None)` acknowledges without a reply.
#[async_trait]
pub trait UserEventHandler: Send + Sync {
    /// Event name this handler serves, or `"*"`.
    fn event(&self) -> &str;
    async fn handle_user_event(&self, req: UserEventRequest) -> Result<Option<Payload>>;
}

enum SystemHandler {
    Connect(Arc<dyn ConnectHandler>),
    Connected(Arc<dyn ConnectedHandler>),
    Disconnected(Arc<dyn DisconnectedHandler>),
}

/// Outcome of one webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Handled(WebhookResponse),
    /// Not this hub's event; the caller routes it elsewhere.
    PassThrough,
}

/// Hub-bound registry and dispatcher for system and user events.
///
/// Holds no per-request state; concurrent requests share it read-only.
pub struct Dispatcher {
    hub: String,
    dump_request: bool,
    system: DashMap<EventKind, SystemHandler>,
    user: DashMap<String, Arc<dyn UserEventHandler>>,
}

impl Dispatcher {
    pub fn new(hub: impl Into<String>) -> Self {
        Self {
            hub: hub.into(),
            dump_request: false,
            system: DashMap::new(),
            user: DashMap::new(),
        }
    }

    /// Log every normalized envelope at info level.
    pub fn with_dump_request(mut self, on: bool) -> Self {
        self.dump_request = on;
        self
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn register_connect(&self, h: Arc<dyn ConnectHandler>) {
        self.system.insert(EventKind::Connect, SystemHandler::Connect(h));
    }

    pub fn register_connected(&self, h: Arc<dyn ConnectedHandler>) {
        self.system.insert(EventKind::Connected, SystemHandler::Connected(h));
    }

    pub fn register_disconnected(&self, h: Arc<dyn DisconnectedHandler>) {
        self.system.insert(EventKind::Disconnected, SystemHandler::Disconnected(h));
    }

    pub fn register_user(&self, h: Arc<dyn UserEventHandler>) {
        self.user.insert(h.event().to_ascii_lowercase(), h);
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::User => !self.user.is_empty(),
            other => self.system.contains_key(&other),
        }
    }

    pub fn registered_user_events(&self) -> Vec<String> {
        self.user.iter().map(|e| e.key().clone()).collect()
    }

    /// Decode, route and encode one request.
    pub async fn handle(&self, envelope: &EventEnvelope) -> Dispatched {
        if self.dump_request {
            tracing::info!(
                headers = ?envelope.headers(),
                body_len = envelope.body().len(),
                "inbound webhook request"
            );
        }

        let routed = envelope
            .cloud_event()
            .and_then(|ce| Ok((classify(&ce, &self.hub)?, ce)));
        let (route, ce) = match routed {
            Ok((Some(route), ce)) => (route, ce),
            Ok((None, _)) => return Dispatched::PassThrough,
            Err(e) => return reject(&self.hub, &e),
        };

        // Defaults for unhandled kinds win over any payload defect.
        if let Some(default) = self.unhandled(&route) {
            return Dispatched::Handled(default.into_response());
        }

        let event = match decode_route(&ce, envelope, &self.hub, &route) {
            Ok(e) => e,
            Err(e) => return reject(&self.hub, &e),
        };

        let ctx = event.context();
        tracing::debug!(
            hub = %ctx.hub,
            connection_id = %ctx.connection_id,
            kind = event.kind().as_str(),
            event = %ctx.event_name,
            "dispatching event"
        );

        Dispatched::Handled(self.invoke(event).await.into_response())
    }

    /// Reply for a route nobody handles, or `None` when a handler exists.
    fn unhandled(&self, route: &Route) -> Option<HandlerResult> {
        match route.kind {
            EventKind::Connect if self.connect_handler().is_none() => {
                tracing::info!(hub = %self.hub, "no connect handler, rejecting");
                Some(unauthorized())
            }
            EventKind::Connected if self.connected_handler().is_none() => {
                Some(HandlerResult::NoResponse)
            }
            EventKind::Disconnected if self.disconnected_handler().is_none() => {
                Some(HandlerResult::NoResponse)
            }
            EventKind::User if self.user_handler(&route.event_name).is_none() => {
                Some(HandlerResult::NoResponse)
            }
            _ => None,
        }
    }

    /// Route an already decoded event. Handler errors and panics stay inside
    /// this call and come back as failures.
    pub async fn invoke(&self, event: InboundEvent) -> HandlerResult {
        match event {
            InboundEvent::Connect(req) => {
                let Some(h) = self.connect_handler() else {
                    tracing::info!(connection_id = %req.context.connection_id, "no connect handler, rejecting");
                    return unauthorized();
                };
                match guarded(h.handle_connect(req)).await {
                    Ok(resp) => resp.into_result(),
                    Err(e) => failure(e),
                }
            }
            InboundEvent::Connected(req) => {
                let Some(h) = self.connected_handler() else {
                    return HandlerResult::NoResponse;
                };
                match guarded(h.on_connected(req)).await {
                    Ok(()) => HandlerResult::NoResponse,
                    Err(e) => failure(e),
                }
            }
            InboundEvent::Disconnected(req) => {
                let Some(h) = self.disconnected_handler() else {
                    return HandlerResult::NoResponse;
                };
                match guarded(h.on_disconnected(req)).await {
                    Ok(()) => HandlerResult::NoResponse,
                    Err(e) => failure(e),
                }
            }
            InboundEvent::User(req) => {
                let Some(h) = self.user_handler(&req.context.event_name) else {
                    return HandlerResult::NoResponse;
                };
                match guarded(h.handle_user_event(req)).await {
                    Ok(payload) => HandlerResult::Success(payload),
                    Err(e) => failure(e),
                }
            }
        }
    }

    fn connect_handler(&self) -> Option<Arc<dyn ConnectHandler>> {
        match self.system.get(&EventKind::Connect)?.value() {
            SystemHandler::Connect(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }

    fn connected_handler(&self) -> Option<Arc<dyn ConnectedHandler>> {
        match self.system.get(&EventKind::Connected)?.value() {
            SystemHandler::Connected(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }

    fn disconnected_handler(&self) -> Option<Arc<dyn DisconnectedHandler>> {
        match self.system.get(&EventKind::Disconnected)?.value() {
            SystemHandler::Disconnected(h) => Some(Arc::clone(h)),
            _ => None,
        }
    }

    /// Exact event name first, then the catch-all.
    fn user_handler(&self, event_name: &str) -> Option<Arc<dyn UserEventHandler>> {
        self.user
            .get(&event_name.to_ascii_lowercase())
            .or_else(|| self.user.get(ANY_USER_EVENT))
            .map(|e| Arc::clone(e.value()))
    }
}

/// Run a handler future, turning a panic into an internal error.
async fn guarded<T, F>(fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(_) => Err(WpsError::Internal("handler panicked".into())),
    }
}

fn unauthorized() -> HandlerResult {
    HandlerResult::Failure {
        code: ErrorCode::Unauthorized,
        detail: None,
    }
}

fn reject(hub: &str, e: &WpsError) -> Dispatched {
    tracing::warn!(%hub, error = %e, "rejecting undecodable event");
    Dispatched::Handled(HandlerResult::from_error(e).into_response())
}

fn failure(e: WpsError) -> HandlerResult {
    if !matches!(e, WpsError::HandlerFailure { .. }) {
        tracing::warn!(error = %e, "event handler failed");
    }
    HandlerResult::from_handler_error(&e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    struct Echo;

    #[async_trait]
    impl UserEventHandler for Echo {
        fn event(&self) -> &str {
            ANY_USER_EVENT
        }
        async fn handle_user_event(&self, req: UserEventRequest) -> Result<Option<Payload>> {
            Ok(Some(Payload::new(req.data, req.data_type)))
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl UserEventHandler for Named {
        fn event(&self) -> &str {
            self.0
        }
        async fn handle_user_event(&self, _req: UserEventRequest) -> Result<Option<Payload>> {
            Ok(Some(Payload::text(self.0)))
        }
    }

    struct Panics;

    #[async_trait]
    impl ConnectedHandler for Panics {
        async fn on_connected(&self, _req: ConnectedRequest) -> Result<()> {
            panic!("boom")
        }
    }

    fn envelope(ty: &str, body: &'static str) -> EventEnvelope {
        EventEnvelope::normalize(
            [
                ("ce-type", ty),
                ("ce-hub", "chat"),
                ("ce-connectionid", "c1"),
                ("content-type", "text/plain"),
            ],
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[tokio::test]
    async fn named_user_handler_wins_over_catch_all() {
        let d = Dispatcher::new("chat");
        d.register_user(Arc::new(Echo));
        d.register_user(Arc::new(Named("Ping")));

        let Dispatched::Handled(r) = d.handle(&envelope("azure.webpubsub.user.ping", "x")).await else {
            panic!("expected handled")
        };
        assert_eq!(r.body, Bytes::from("Ping"));

        let Dispatched::Handled(r) = d.handle(&envelope("azure.webpubsub.user.other", "x")).await else {
            panic!("expected handled")
        };
        assert_eq!(r.body, Bytes::from("x"));
    }

    #[tokio::test]
    async fn panicking_handler_is_isolated() {
        let d = Dispatcher::new("chat");
        d.register_connected(Arc::new(Panics));

        let Dispatched::Handled(r) = d.handle(&envelope("azure.webpubsub.sys.connected", "")).await else {
            panic!("expected handled")
        };
        assert_eq!(r.status, 500);
        assert_eq!(r.body, Bytes::from("internal: handler panicked"));
    }

    #[test]
    fn registration_is_observable() {
        let d = Dispatcher::new("chat");
        assert!(!d.has_handler(EventKind::Connect));
        assert!(!d.has_handler(EventKind::User));
        d.register_user(Arc::new(Named("Ping")));
        assert!(d.has_handler(EventKind::User));
        assert_eq!(d.registered_user_events(), vec!["ping".to_string()]);
    }

    fn handled(d: Dispatched) -> WebhookResponse {
        match d {
            Dispatched::Handled(r) => r,
            Dispatched::PassThrough => panic!("expected handled"),
        }
    }

    #[tokio::test]
    async fn unhandled_connect_is_unauthorized_even_when_malformed() {
        let d = Dispatcher::new("chat");

        let r = handled(d.handle(&envelope("azure.webpubsub.sys.connect", "{not json")).await);
        assert_eq!(r.status, 401);
        assert!(r.body.is_empty());

        let no_conn_id = EventEnvelope::normalize(
            [("ce-type", "azure.webpubsub.sys.connect"), ("ce-hub", "chat")],
            Bytes::new(),
        );
        assert_eq!(handled(d.handle(&no_conn_id).await).status, 401);
    }

    #[tokio::test]
    async fn unhandled_user_event_with_empty_body_is_acknowledged() {
        let d = Dispatcher::new("chat");
        d.register_user(Arc::new(Named("ping")));

        let r = handled(d.handle(&envelope("azure.webpubsub.user.message", "")).await);
        assert_eq!(r, WebhookResponse::empty(200));
    }

    #[tokio::test]
    async fn handled_user_event_still_validates_payload() {
        let d = Dispatcher::new("chat");
        d.register_user(Arc::new(Echo));

        let r = handled(d.handle(&envelope("azure.webpubsub.user.message", "")).await);
        assert_eq!(r.status, 400);
    }
}
