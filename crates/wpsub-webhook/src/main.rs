//! wpsub webhook server.
//!
//! Usage: `wpsub-webhook [config.yaml]` (default `wpsub.yaml`).
//! Log level comes from `RUST_LOG`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use wpsub_client::{RestClient, ServiceClient};
use wpsub_core::error::{Result, WpsError};
use wpsub_core::ConnectionDescriptor;
use wpsub_webhook::{app_state, config, dispatch::Dispatcher, router, services::ChatService};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, kind = e.kind(), "wpsub-webhook failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "wpsub.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let listen: SocketAddr = cfg.webhook.listen.parse().map_err(|e| {
        WpsError::Configuration(format!("webhook.listen must be a valid SocketAddr: {e}"))
    })?;

    let chat = match &cfg.service {
        Some(svc) => {
            let descriptor = ConnectionDescriptor::parse(&svc.connection_string)?;
            let rest = RestClient::new(descriptor, svc.token_ttl_secs);
            Arc::new(ChatService::with_client(ServiceClient::new(
                rest,
                cfg.webhook.hub.clone(),
            )))
        }
        None => Arc::new(ChatService::new()),
    };

    let dispatcher =
        Dispatcher::new(cfg.webhook.hub.clone()).with_dump_request(cfg.webhook.dump_request);
    dispatcher.register_connect(chat.clone());
    dispatcher.register_connected(chat.clone());
    dispatcher.register_disconnected(chat.clone());
    dispatcher.register_user(chat);

    let state = app_state::AppState::new(cfg, Arc::new(dispatcher))?;
    let route = state.route_path().to_string();
    let app = router::build_router(state);

    tracing::info!(%listen, %route, "wpsub-webhook starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| WpsError::Transport(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WpsError::Transport(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
