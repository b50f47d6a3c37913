//! Shared error type across wpsub crates.

use thiserror::Error;

use crate::protocol::response::ErrorCode;

/// Shared result type.
pub type Result<T> = std::result::Result<T, WpsError>;

/// Unified error type used by core, webhook and client.
#[derive(Debug, Error)]
pub enum WpsError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("handler failure ({}): {}", code.as_u16(), detail.as_deref().unwrap_or(""))]
    HandlerFailure {
        code: ErrorCode,
        detail: Option<String>,
    },
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl WpsError {
    /// Stable identifier used in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            WpsError::InvalidConnectionString(_) => "INVALID_CONNECTION_STRING",
            WpsError::Configuration(_) => "CONFIGURATION",
            WpsError::MalformedEvent(_) => "MALFORMED_EVENT",
            WpsError::UnsupportedEvent(_) => "UNSUPPORTED_EVENT",
            WpsError::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            WpsError::HandlerFailure { .. } => "HANDLER_FAILURE",
            WpsError::Transport(_) => "TRANSPORT",
            WpsError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status used when this error crosses the webhook boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            WpsError::MalformedEvent(_) | WpsError::UnsupportedEvent(_) => 400,
            WpsError::HandlerFailure { code, .. } => code.as_u16(),
            _ => 500,
        }
    }

    /// Shorthand for a handler-signaled rejection.
    pub fn fail(code: ErrorCode, detail: impl Into<String>) -> Self {
        WpsError::HandlerFailure {
            code,
            detail: Some(detail.into()),
        }
    }
}
