//! Hub-scoped management client.
//!
//! Thin wrappers over `RestClient`: one method per service operation, each
//! pinning the status codes it treats as success (200/202) or as a clean
//! negative answer (404 on existence probes).

use bytes::Bytes;
use reqwest::Method;

use wpsub_core::auth::{ClaimMap, DEFAULT_TOKEN_TTL_SECS};
use wpsub_core::error::Result;
use wpsub_core::ConnectionDescriptor;

use crate::permissions::PermissionClient;
use crate::rest::{RestClient, RestRequest};

/// Outbound message body, labelled by content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Json(String),
    Binary(Bytes),
}

impl Message {
    fn into_body(self) -> (&'static str, Bytes) {
        match self {
            Message::Text(s) => ("text/plain", Bytes::from(s)),
            Message::Json(s) => ("application/json", Bytes::from(s)),
            Message::Binary(b) => ("application/octet-stream", b),
        }
    }
}

/// Token options for a client connection.
#[derive(Debug, Clone, Default)]
pub struct ClientAccessOptions {
    pub user_id: Option<String>,
    /// Appended to the `role` claim.
    pub roles: Vec<String>,
    pub claims: ClaimMap,
    pub ttl_secs: Option<u64>,
}

/// What a browser needs to open its WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAccess {
    pub base_url: String,
    pub token: String,
    /// `base_url?access_token=<token>`
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServiceClient {
    rest: RestClient,
    hub: String,
    permissions: PermissionClient,
}

impl ServiceClient {
    pub fn new(rest: RestClient, hub: impl Into<String>) -> Self {
        let hub = hub.into();
        Self {
            permissions: PermissionClient::new(rest.clone(), hub.clone()),
            rest,
            hub,
        }
    }

    /// Parse the connection string and sign with the default one-hour TTL.
    pub fn from_connection_string(conn: &str, hub: impl Into<String>) -> Result<Self> {
        let descriptor = ConnectionDescriptor::parse(conn)?;
        Ok(Self::new(RestClient::new(descriptor, DEFAULT_TOKEN_TTL_SECS), hub))
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn permissions(&self) -> &PermissionClient {
        &self.permissions
    }

    /// Mint a client token and connection URL for this hub.
    pub fn get_client_access(&self, opts: &ClientAccessOptions) -> Result<ClientAccess> {
        let d = self.rest.descriptor();
        let base_url = d.client_url(&self.hub);

        let mut claims = opts.claims.clone();
        if !opts.roles.is_empty() {
            claims
                .entry("role".to_string())
                .or_default()
                .extend(opts.roles.iter().cloned());
        }

        let token = self.rest.signer().sign(
            &d.client_audience(&self.hub),
            opts.ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            opts.user_id.as_deref(),
            &claims,
        )?;
        let url = format!("{base_url}?access_token={token}");

        Ok(ClientAccess {
            base_url,
            token,
            url,
        })
    }

    pub async fn send_to_all(&self, message: Message, excluded: &[String]) -> Result<()> {
        let mut req = self.hub_req(Method::POST, &[":send"]);
        for id in excluded {
            req = req.query("excluded", id.as_str());
        }
        self.send_body(req, message, &[202]).await
    }

    pub async fn send_to_user(&self, user_id: &str, message: Message) -> Result<()> {
        let req = self.hub_req(Method::POST, &["users", user_id, ":send"]);
        self.send_body(req, message, &[202]).await
    }

    pub async fn send_to_connection(&self, connection_id: &str, message: Message) -> Result<()> {
        let req = self.hub_req(Method::POST, &["connections", connection_id, ":send"]);
        self.send_body(req, message, &[202]).await
    }

    pub async fn send_to_group(&self, group: &str, message: Message, excluded: &[String]) -> Result<()> {
        let mut req = self.hub_req(Method::POST, &["groups", group, ":send"]);
        for id in excluded {
            req = req.query("excluded", id.as_str());
        }
        self.send_body(req, message, &[202]).await
    }

    pub async fn has_connection(&self, connection_id: &str) -> Result<bool> {
        let req = self.hub_req(Method::HEAD, &["connections", connection_id]);
        self.rest.send(req).await?.exists(200, 404)
    }

    pub async fn close_connection(&self, connection_id: &str, reason: Option<&str>) -> Result<()> {
        let req = self
            .hub_req(Method::DELETE, &["connections", connection_id])
            .query_opt("reason", reason);
        self.rest.send(req).await?.expect_status(&[200])
    }

    pub async fn has_group(&self, group: &str) -> Result<bool> {
        let req = self.hub_req(Method::HEAD, &["groups", group]);
        self.rest.send(req).await?.exists(200, 404)
    }

    pub async fn add_connection_to_group(&self, group: &str, connection_id: &str) -> Result<()> {
        let req = self.hub_req(Method::PUT, &["groups", group, "connections", connection_id]);
        self.rest.send(req).await?.expect_status(&[200, 202])
    }

    pub async fn remove_connection_from_group(&self, group: &str, connection_id: &str) -> Result<()> {
        let req = self.hub_req(Method::DELETE, &["groups", group, "connections", connection_id]);
        self.rest.send(req).await?.expect_status(&[200, 202])
    }

    pub async fn has_user(&self, user_id: &str) -> Result<bool> {
        let req = self.hub_req(Method::HEAD, &["users", user_id]);
        self.rest.send(req).await?.exists(200, 404)
    }

    pub async fn add_user_to_group(&self, group: &str, user_id: &str) -> Result<()> {
        let req = self.hub_req(Method::PUT, &["users", user_id, "groups", group]);
        self.rest.send(req).await?.expect_status(&[200, 202])
    }

    pub async fn has_user_in_group(&self, group: &str, user_id: &str) -> Result<bool> {
        let req = self.hub_req(Method::HEAD, &["users", user_id, "groups", group]);
        self.rest.send(req).await?.exists(200, 404)
    }

    pub async fn remove_user_from_group(&self, group: &str, user_id: &str) -> Result<()> {
        let req = self.hub_req(Method::DELETE, &["users", user_id, "groups", group]);
        self.rest.send(req).await?.expect_status(&[200, 202])
    }

    pub async fn remove_user_from_all_groups(&self, user_id: &str) -> Result<()> {
        let req = self.hub_req(Method::DELETE, &["users", user_id, "groups"]);
        self.rest.send(req).await?.expect_status(&[200, 202])
    }

    /// Any failure (network or status) reads as unhealthy.
    pub async fn is_service_healthy(&self) -> bool {
        let req = RestRequest::new(Method::HEAD, ["api", "health"]);
        match self.rest.send(req).await {
            Ok(resp) => resp.status == 200,
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    fn hub_req(&self, method: Method, tail: &[&str]) -> RestRequest {
        let head = ["api", "hubs", self.hub.as_str()];
        RestRequest::new(method, head.iter().chain(tail.iter()).copied())
    }

    async fn send_body(&self, req: RestRequest, message: Message, ok: &[u16]) -> Result<()> {
        let (content_type, body) = message.into_body();
        self.rest.send(req.body(content_type, body)).await?.expect_status(ok)
    }
}
