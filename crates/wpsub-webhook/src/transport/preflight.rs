//! Abuse-protection preflight.
//!
//! Before delivering events the service sends an `OPTIONS` probe carrying
//! `WebHook-Request-Origin`; the webhook must answer 200 with
//! `WebHook-Allowed-Origin` listing the origins it accepts events from.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::policy::AllowedOrigins;

pub const REQUEST_ORIGIN_HEADER: &str = "webhook-request-origin";
pub const ALLOWED_ORIGIN_HEADER: &str = "webhook-allowed-origin";

/// Answer the probe if `headers` carry one. `None` means the request is not
/// a preflight and the caller routes it elsewhere.
pub fn handle_preflight(headers: &HeaderMap, origins: &AllowedOrigins) -> Option<Response> {
    let origin = headers.get(REQUEST_ORIGIN_HEADER)?;
    let origin = origin.to_str().unwrap_or_default();

    if !origins.allows(origin) {
        tracing::debug!(%origin, allowed = ?origins.entries(), "preflight origin not in allow-list");
    }

    let value = match HeaderValue::from_str(&origins.entries().join(",")) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "allow-list is not a valid header value");
            return Some(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
    };

    let mut resp = StatusCode::OK.into_response();
    resp.headers_mut().insert(ALLOWED_ORIGIN_HEADER, value);
    Some(resp)
}

/// `OPTIONS <path>`
pub async fn options_probe(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match handle_preflight(&headers, state.origins()) {
        Some(resp) => resp,
        None => {
            tracing::warn!("OPTIONS without {REQUEST_ORIGIN_HEADER}");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}
