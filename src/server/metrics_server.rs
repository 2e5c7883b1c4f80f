// src/server/metrics_server.rs

//! Serves the Prometheus registry over HTTP.

use crate::core::metrics::{self, gather_metrics};
use crate::core::state::ServerState;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Syncs the gauges that mirror registry state, then encodes every metric.
async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let registry = &state.registry;
    metrics::BOUND_ACCOUNTS.set(registry.bound_account_count() as f64);
    metrics::MAINTENANCE_MODE.set(if registry.is_maintenance() { 1.0 } else { 0.0 });

    (
        StatusCode::OK,
        [("content-type", PROMETHEUS_CONTENT_TYPE)],
        gather_metrics(),
    )
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Runs the `/metrics` endpoint until the global shutdown signal fires.
/// A bind failure is logged and ends the task without taking the game server down.
pub async fn run_metrics_server(state: Arc<ServerState>, mut shutdown_rx: broadcast::Receiver<()>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.metrics.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };
    info!("Prometheus metrics available at http://{}/metrics", addr);

    let shutdown = async move {
        let _ = shutdown_rx.recv().await;
        info!("Metrics server shutting down.");
    };
    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Metrics server stopped with an error: {}", e);
    }
}
