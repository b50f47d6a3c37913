//! Demo chat hub.
//!
//! Accepts every connection (user id from the `userId` claim, the `user`
//! query parameter, or the service-assigned one), and relays `message`
//! events to the whole hub when a management client is configured.
//! Otherwise it echoes the message back to the sender.

use async_trait::async_trait;
use serde_json::json;

use wpsub_client::{Message, ServiceClient};
use wpsub_core::error::{Result, WpsError};
use wpsub_core::protocol::{
    ConnectRequest, ConnectResponse, ConnectedRequest, DataType, DisconnectedRequest, ErrorCode,
    Payload, UserEventRequest,
};

use crate::dispatch::{ConnectHandler, ConnectedHandler, DisconnectedHandler, UserEventHandler};

/// Message text that makes the handler reject the event.
pub const ABORT: &str = "abort";

#[derive(Default)]
pub struct ChatService {
    client: Option<ServiceClient>,
}

impl ChatService {
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Broadcast through the service instead of echoing.
    pub fn with_client(client: ServiceClient) -> Self {
        Self {
            client: Some(client),
        }
    }
}

fn first(map: &wpsub_core::auth::ClaimMap, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.first()).cloned()
}

#[async_trait]
impl ConnectHandler for ChatService {
    async fn handle_connect(&self, req: ConnectRequest) -> Result<ConnectResponse> {
        let user = first(&req.claims, "userId")
            .or_else(|| first(&req.queries, "user"))
            .or_else(|| req.context.user_id.clone());

        Ok(ConnectResponse {
            user_id: user,
            subprotocol: req.subprotocols.first().cloned(),
            ..ConnectResponse::default()
        })
    }
}

#[async_trait]
impl ConnectedHandler for ChatService {
    async fn on_connected(&self, req: ConnectedRequest) -> Result<()> {
        tracing::info!(
            connection_id = %req.context.connection_id,
            user = ?req.context.user_id,
            "chat: connected"
        );
        Ok(())
    }
}

#[async_trait]
impl DisconnectedHandler for ChatService {
    async fn on_disconnected(&self, req: DisconnectedRequest) -> Result<()> {
        tracing::info!(
            connection_id = %req.context.connection_id,
            reason = ?req.reason,
            "chat: disconnected"
        );
        Ok(())
    }
}

#[async_trait]
impl UserEventHandler for ChatService {
    fn event(&self) -> &str {
        "message"
    }

    async fn handle_user_event(&self, req: UserEventRequest) -> Result<Option<Payload>> {
        let text = match req.data_type {
            DataType::Binary => None,
            _ => req.text(),
        };

        if text.map(str::trim) == Some(ABORT) {
            return Err(WpsError::fail(ErrorCode::UserError, ABORT));
        }

        let Some(client) = &self.client else {
            return Ok(Some(Payload::new(req.data, req.data_type)));
        };

        let msg = match text {
            Some(t) => Message::Json(
                json!({
                    "from": req.context.user_id.as_deref().unwrap_or(&req.context.connection_id),
                    "msg": t,
                })
                .to_string(),
            ),
            None => Message::Binary(req.data.clone()),
        };
        client.send_to_all(msg, &[]).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use wpsub_core::protocol::Context;

    fn ctx() -> Context {
        Context {
            hub: "chat".into(),
            connection_id: "c1".into(),
            user_id: None,
            event_name: "message".into(),
            signature: vec![],
            request_host: "localhost".into(),
        }
    }

    fn msg(text: &'static str) -> UserEventRequest {
        UserEventRequest {
            context: ctx(),
            data: Bytes::from_static(text.as_bytes()),
            data_type: DataType::Text,
        }
    }

    #[tokio::test]
    async fn abort_is_rejected_with_400() {
        let err = ChatService::new().handle_user_event(msg("abort")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn echoes_without_client() {
        let out = ChatService::new().handle_user_event(msg("hi")).await.unwrap();
        assert_eq!(out, Some(Payload::text("hi")));
    }

    #[tokio::test]
    async fn connect_prefers_claimed_user() {
        let mut claims = wpsub_core::auth::ClaimMap::new();
        claims.insert("userId".into(), vec!["alice".into()]);
        let mut queries = wpsub_core::auth::ClaimMap::new();
        queries.insert("user".into(), vec!["bob".into()]);

        let resp = ChatService::new()
            .handle_connect(ConnectRequest {
                context: ctx(),
                claims,
                queries,
                subprotocols: vec![],
                client_certificates: vec![],
            })
            .await
            .unwrap();
        assert_eq!(resp.user_id.as_deref(), Some("alice"));
    }
}
