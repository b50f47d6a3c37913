//! Shared application state for the webhook server.
//!
//! Built once at startup; everything inside is read-only afterwards, so
//! request handlers clone the `Arc`s and never lock.

use std::sync::Arc;

use wpsub_core::error::{Result, WpsError};
use wpsub_core::protocol::EventKind;

use crate::config::WebhookConfig;
use crate::dispatch::Dispatcher;
use crate::policy::AllowedOrigins;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: WebhookConfig,
    origins: AllowedOrigins,
    route_path: String,
}

impl AppState {
    /// Bind a validated config to a dispatcher that already has its handlers.
    pub fn new(cfg: WebhookConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        if dispatcher.hub() != cfg.webhook.hub {
            return Err(WpsError::Configuration(format!(
                "dispatcher hub {} does not match webhook.hub {}",
                dispatcher.hub(),
                cfg.webhook.hub
            )));
        }

        let origins = AllowedOrigins::compile(&cfg.webhook.allowed_endpoints)?;

        if !dispatcher.has_handler(EventKind::Connect) {
            tracing::warn!(hub = %cfg.webhook.hub, "no connect handler registered; every connect will be rejected");
        }

        let route_path = cfg.webhook.route_path();
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                origins,
                route_path,
            }),
            dispatcher,
        })
    }

    pub fn cfg(&self) -> &WebhookConfig {
        &self.inner.cfg
    }

    pub fn origins(&self) -> &AllowedOrigins {
        &self.inner.origins
    }

    pub fn route_path(&self) -> &str {
        &self.inner.route_path
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }
}
