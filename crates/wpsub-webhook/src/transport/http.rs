//! `POST <path>`: read the body once, normalize, dispatch, encode.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use wpsub_core::protocol::{EventEnvelope, WebhookResponse};

use crate::app_state::AppState;
use crate::dispatch::Dispatched;

pub async fn post_event(State(state): State<AppState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let body = match axum::body::to_bytes(body, state.cfg().webhook.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read webhook body");
            return (StatusCode::BAD_REQUEST, "unreadable request body").into_response();
        }
    };

    let envelope = EventEnvelope::normalize(
        parts
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned())),
        body,
    );

    match state.dispatcher().handle(&envelope).await {
        Dispatched::Handled(r) => into_axum(r),
        Dispatched::PassThrough => StatusCode::NOT_FOUND.into_response(),
    }
}

fn into_axum(r: WebhookResponse) -> Response {
    let status = StatusCode::from_u16(r.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = Response::new(Body::from(r.body));
    *resp.status_mut() = status;
    if let Some(ct) = r.content_type {
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(ct));
    }
    resp
}
