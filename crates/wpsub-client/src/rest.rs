//! Bearer-authenticated transport to the management REST surface.
//!
//! Every call is signed with a fresh short-lived token whose audience is the
//! full request URL with the port stripped, and carries `api-version`.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{header, Method};
use url::Url;

use wpsub_core::auth::{ClaimMap, TokenSigner};
use wpsub_core::endpoint::audience_for;
use wpsub_core::error::{Result, WpsError};
use wpsub_core::ConnectionDescriptor;

/// REST API version understood by the service.
pub const API_VERSION: &str = "2020-10-01";

/// One management call, before signing.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    /// Path segments after the service root, percent-encoded on build.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<(&'static str, Bytes)>,
}

impl RestRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn body(mut self, content_type: &'static str, body: Bytes) -> Self {
        self.body = Some((content_type, body));
        self
    }
}

/// Status + body of a completed call.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    /// Succeed only on one of `ok`.
    pub fn expect_status(self, ok: &[u16]) -> Result<()> {
        if ok.contains(&self.status) {
            return Ok(());
        }
        Err(self.unexpected())
    }

    /// Existence probe: `found` => true, `missing` => false.
    pub fn exists(self, found: u16, missing: u16) -> Result<bool> {
        match self.status {
            s if s == found => Ok(true),
            s if s == missing => Ok(false),
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(self) -> WpsError {
        tracing::warn!(status = self.status, body = %self.body, "unexpected service status");
        WpsError::UnexpectedStatus {
            status: self.status,
            body: self.body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    descriptor: Arc<ConnectionDescriptor>,
    signer: TokenSigner,
    token_ttl_secs: u64,
}

impl RestClient {
    pub fn new(descriptor: ConnectionDescriptor, token_ttl_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer: TokenSigner::new(descriptor.key.clone()),
            descriptor: Arc::new(descriptor),
            token_ttl_secs,
        }
    }

    /// Swap in a preconfigured HTTP client (timeouts, proxies).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Absolute URL for `req`, `api-version` first.
    pub fn url(&self, req: &RestRequest) -> Result<Url> {
        let mut url = self.descriptor.service_host.clone();
        url.path_segments_mut()
            .map_err(|_| WpsError::Configuration("service host cannot be a base url".into()))?
            .pop_if_empty()
            .extend(req.segments.iter());
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("api-version", API_VERSION);
            for (k, v) in &req.query {
                q.append_pair(k, v);
            }
        }
        Ok(url)
    }

    pub async fn send(&self, req: RestRequest) -> Result<RestResponse> {
        let url = self.url(&req)?;
        let token = self.signer.sign(
            &audience_for(&url)?,
            self.token_ttl_secs,
            None,
            &ClaimMap::new(),
        )?;

        let mut builder = self
            .http
            .request(req.method.clone(), url.clone())
            .bearer_auth(token);
        if let Some((content_type, body)) = req.body {
            builder = builder.header(header::CONTENT_TYPE, content_type).body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(method = %req.method, %url, error = %e, "service call failed");
            WpsError::Transport(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| WpsError::Transport(format!("read body failed: {e}")))?;

        tracing::debug!(method = %req.method, %url, status, "invoked service api");
        Ok(RestResponse { status, body })
    }
}
