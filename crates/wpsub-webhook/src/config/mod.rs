//! Webhook config loader (strict parsing).

pub mod schema;

use std::fs;

use wpsub_core::error::{Result, WpsError};

pub use schema::{ServiceSection, WebhookConfig, WebhookSection};

pub fn load_from_file(path: &str) -> Result<WebhookConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WpsError::Configuration(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<WebhookConfig> {
    let cfg: WebhookConfig = serde_yaml::from_str(s)
        .map_err(|e| WpsError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
