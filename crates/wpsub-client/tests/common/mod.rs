//! Programmable stand-in for the management REST surface.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

pub const KEY: &str = "test-access-key";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct Stub {
    status: Arc<AtomicU16>,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn last(&self) -> Recorded {
        self.seen.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

async fn record(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    stub.seen.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });
    StatusCode::from_u16(stub.status.load(Ordering::SeqCst)).unwrap()
}

/// Start the stub on an ephemeral port; returns its address.
pub async fn start_stub(initial_status: u16) -> (SocketAddr, Stub) {
    let stub = Stub::default();
    stub.respond_with(initial_status);

    let app = Router::new().fallback(record).with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, stub)
}

pub fn connection_string(addr: SocketAddr) -> String {
    format!("Endpoint=http://127.0.0.1;Port={};AccessKey={KEY};Version=1.0;", addr.port())
}

/// Decode a bearer header and return its audience.
pub fn bearer_audience(authorization: &str) -> String {
    let token = authorization.strip_prefix("Bearer ").expect("bearer scheme");
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_aud = false;
    let data = decode::<serde_json::Value>(token, &DecodingKey::from_secret(KEY.as_bytes()), &v).unwrap();
    data.claims["aud"].as_str().unwrap().to_string()
}
