//! Allowed-origin compilation and matching.
//!
//! Entries are service endpoints (`https://x.example`) reduced to their host,
//! or the wildcard `*`.

use url::Url;

use wpsub_core::error::{Result, WpsError};

pub const ANY_ORIGIN: &str = "*";

/// Immutable after construction; shared across requests without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    entries: Vec<String>,
}

impl AllowedOrigins {
    pub fn compile(raw: &[String]) -> Result<Self> {
        let mut entries = Vec::with_capacity(raw.len());
        for s in raw {
            let s = s.trim();
            if s == ANY_ORIGIN {
                if !entries.iter().any(|e| e == ANY_ORIGIN) {
                    entries.push(ANY_ORIGIN.to_string());
                }
                continue;
            }
            let url = Url::parse(s).map_err(|e| {
                WpsError::Configuration(format!("invalid allowed endpoint: {s} ({e})"))
            })?;
            let host = url.host_str().ok_or_else(|| {
                WpsError::Configuration(format!("allowed endpoint has no host: {s}"))
            })?;
            let origin = match url.port() {
                Some(p) => format!("{host}:{p}"),
                None => host.to_string(),
            };
            if !entries.contains(&origin) {
                entries.push(origin);
            }
        }
        if entries.is_empty() {
            return Err(WpsError::Configuration("allowed_endpoints must not be empty".into()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e == ANY_ORIGIN || e.eq_ignore_ascii_case(origin))
    }
}
