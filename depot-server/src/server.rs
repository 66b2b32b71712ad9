//! HTTP server assembly and lifecycle.

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;
use crate::{api, frontend, internal, sparse};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub index: &'static str,
    pub storage: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "depot",
        version: env!("CARGO_PKG_VERSION"),
        index: state.index.kind(),
        storage: state.storage.kind(),
    })
}

/// Assemble every route enabled by the configuration.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_request_body_size_bytes();

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .merge(api::routes(state.clone()))
        .merge(sparse::routes(state.clone()));

    if state.config.frontend.enabled {
        router = router.merge(frontend::routes());
    }
    if state.config.internal.enabled {
        router = router.merge(internal::routes(state.clone()));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the registry until Ctrl-C.
pub async fn run_server(config: Config) -> Result<()> {
    let addr = config.bind_address()?;
    info!(
        index = config.index.kind(),
        storage = config.storage.kind(),
        "Starting depot"
    );

    let state = AppState::new(config).context("Failed to initialise application state")?;
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!(address = %addr, "Registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping gracefully");
}
