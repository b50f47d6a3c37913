use serde::Deserialize;
use wpsub_core::error::{Result, WpsError};
use wpsub_core::ConnectionDescriptor;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    pub version: u32,

    pub webhook: WebhookSection,

    #[serde(default)]
    pub service: Option<ServiceSection>,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WpsError::Configuration(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.webhook.validate()?;

        if let Some(svc) = &self.service {
            svc.validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    pub hub: String,

    /// Defaults to `/api/webpubsub/hubs/{hub}/`.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_allowed_endpoints")]
    pub allowed_endpoints: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default)]
    pub dump_request: bool,
}

impl WebhookSection {
    pub fn validate(&self) -> Result<()> {
        if self.hub.is_empty()
            || !self
                .hub
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(WpsError::Configuration(
                "webhook.hub must be non-empty and contain only [A-Za-z0-9_-]".into(),
            ));
        }
        if let Some(p) = &self.path {
            if !p.starts_with('/') {
                return Err(WpsError::Configuration("webhook.path must start with '/'".into()));
            }
        }
        if !(1..=64 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(WpsError::Configuration(
                "webhook.max_body_bytes must be between 1 and 67108864".into(),
            ));
        }
        if self.allowed_endpoints.is_empty() {
            return Err(WpsError::Configuration(
                "webhook.allowed_endpoints must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Route path, always with a trailing slash.
    pub fn route_path(&self) -> String {
        let p = self
            .path
            .clone()
            .unwrap_or_else(|| format!("/api/webpubsub/hubs/{}", self.hub));
        if p.ends_with('/') {
            p
        } else {
            format!("{p}/")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    pub connection_string: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl ServiceSection {
    pub fn validate(&self) -> Result<()> {
        ConnectionDescriptor::parse(&self.connection_string)?;
        if !(60..=86400).contains(&self.token_ttl_secs) {
            return Err(WpsError::Configuration(
                "service.token_ttl_secs must be between 60 and 86400".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_allowed_endpoints() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}
fn default_token_ttl_secs() -> u64 {
    3600
}
