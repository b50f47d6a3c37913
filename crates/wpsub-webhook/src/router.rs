//! Axum router wiring.
//!
//! `POST`/`OPTIONS` on the hub path, plus `/healthz`.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let path = state.route_path().to_string();
    Router::new()
        .route(
            &path,
            post(transport::http::post_event).options(transport::preflight::options_probe),
        )
        .route("/healthz", get(ops::healthz))
        .with_state(state)
}
