//! Handler outcomes and their HTTP encoding.

use bytes::Bytes;
use serde::Serialize;

use crate::error::WpsError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Failure codes the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// 400
    UserError,
    /// 401
    Unauthorized,
    /// 500
    ServerError,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::UserError => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::ServerError => 500,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            400 => Some(ErrorCode::UserError),
            401 => Some(ErrorCode::Unauthorized),
            500 => Some(ErrorCode::ServerError),
            _ => None,
        }
    }
}

/// Payload data type of a user event or its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Binary,
    Text,
    Json,
}

impl DataType {
    pub fn content_type(self) -> &'static str {
        match self {
            DataType::Binary => CONTENT_TYPE_BINARY,
            DataType::Text => CONTENT_TYPE_TEXT,
            DataType::Json => CONTENT_TYPE_JSON,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Binary => "binary",
            DataType::Text => "text",
            DataType::Json => "json",
        }
    }
}

/// Data plus how to label it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub data: Bytes,
    pub data_type: DataType,
}

impl Payload {
    pub fn new(data: impl Into<Bytes>, data_type: DataType) -> Self {
        Self {
            data: data.into(),
            data_type,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(Bytes::from(s.into()), DataType::Text)
    }

    /// JSON text passed through verbatim (not re-serialized).
    pub fn json_text(s: impl Into<String>) -> Self {
        Self::new(Bytes::from(s.into()), DataType::Json)
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        Self::new(b, DataType::Binary)
    }
}

/// Successful connect reply; all fields optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
}

impl ConnectResponse {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// 200 with this object as JSON.
    pub fn into_result(self) -> HandlerResult {
        match serde_json::to_vec(&self) {
            Ok(body) => HandlerResult::Success(Some(Payload::new(body, DataType::Json))),
            Err(e) => HandlerResult::Failure {
                code: ErrorCode::ServerError,
                detail: Some(format!("connect response encode failed: {e}")),
            },
        }
    }
}

/// What a dispatch produced, before HTTP encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    Success(Option<Payload>),
    Failure {
        code: ErrorCode,
        detail: Option<String>,
    },
    NoResponse,
}

impl HandlerResult {
    /// Translate an error at the webhook boundary.
    pub fn from_error(err: &WpsError) -> Self {
        match err {
            WpsError::HandlerFailure { code, detail } => HandlerResult::Failure {
                code: *code,
                detail: detail.clone(),
            },
            other => HandlerResult::Failure {
                code: ErrorCode::from_u16(other.status_code()).unwrap_or(ErrorCode::ServerError),
                detail: Some(other.to_string()),
            },
        }
    }

    /// Anything a handler raised that is not an explicit rejection is a 500.
    pub fn from_handler_error(err: &WpsError) -> Self {
        match err {
            WpsError::HandlerFailure { .. } => Self::from_error(err),
            other => HandlerResult::Failure {
                code: ErrorCode::ServerError,
                detail: Some(other.to_string()),
            },
        }
    }

    pub fn into_response(self) -> WebhookResponse {
        match self {
            HandlerResult::Success(Some(p)) => WebhookResponse {
                status: 200,
                content_type: Some(p.data_type.content_type()),
                body: p.data,
            },
            HandlerResult::Success(None) | HandlerResult::NoResponse => WebhookResponse::empty(200),
            HandlerResult::Failure { code, detail } => WebhookResponse {
                status: code.as_u16(),
                content_type: detail.as_ref().map(|_| CONTENT_TYPE_TEXT),
                body: detail.map(Bytes::from).unwrap_or_default(),
            },
        }
    }
}

/// Transport-neutral HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Bytes,
}

impl WebhookResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_passes_through_byte_for_byte() {
        let raw = r#"{ "b": 2,  "a": [1, 2] }"#;
        let resp = HandlerResult::Success(Some(Payload::json_text(raw))).into_response();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, Some("application/json"));
        assert_eq!(resp.body, Bytes::from(raw));
    }

    #[test]
    fn data_type_content_types() {
        assert_eq!(DataType::Binary.content_type(), "application/octet-stream");
        assert_eq!(DataType::Text.content_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn failure_carries_detail_as_text() {
        let resp = HandlerResult::Failure {
            code: ErrorCode::UserError,
            detail: Some("abort".into()),
        }
        .into_response();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body, Bytes::from("abort"));

        let resp = HandlerResult::Failure { code: ErrorCode::Unauthorized, detail: None }.into_response();
        assert_eq!(resp, WebhookResponse::empty(401));
    }

    #[test]
    fn connect_response_is_camel_case() {
        let mut r = ConnectResponse::user("alice");
        r.groups.push("g1".into());
        let resp = r.into_result().into_response();
        assert_eq!(resp.content_type, Some("application/json"));
        assert_eq!(resp.body, Bytes::from(r#"{"userId":"alice","groups":["g1"]}"#));
    }

    #[test]
    fn anonymous_connect_is_empty_object() {
        let resp = ConnectResponse::default().into_result().into_response();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, Bytes::from("{}"));
    }

    #[test]
    fn errors_translate_at_boundary() {
        let r = HandlerResult::from_error(&WpsError::MalformedEvent("empty data payload".into()));
        assert_eq!(
            r,
            HandlerResult::Failure {
                code: ErrorCode::UserError,
                detail: Some("malformed event: empty data payload".into()),
            }
        );
        let r = HandlerResult::from_error(&WpsError::Internal("db down".into()));
        assert_eq!(r.into_response().status, 500);

        let r = HandlerResult::from_handler_error(&WpsError::MalformedEvent("bad".into()));
        assert_eq!(r.into_response().status, 500);
        let r = HandlerResult::from_handler_error(&WpsError::fail(ErrorCode::UserError, "abort"));
        assert_eq!(r.into_response().body, Bytes::from("abort"));
    }
}
