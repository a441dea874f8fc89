// HTTP server for Prometheus metrics and rate limit queries
//
// Listens on 0.0.0.0:<metrics.port> (default 9090):
// - /metrics                              Prometheus scrape endpoint
// - /health                               liveness
// - /rate-limits                          every rate limit, key order
// - /rate-limits/{channel_id}/{denom}     one rate limit or 404
// - /rate-limits/chain/{chain_id}         rate limits on channels to a chain

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::metrics;
use crate::node::SharedNode;

/// Build the router over a shared node
pub fn router(node: SharedNode) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/rate-limits", get(list_handler))
        .route("/rate-limits/chain/{chain_id}", get(by_chain_handler))
        .route("/rate-limits/{channel_id}/{denom}", get(get_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(port: u16, node: SharedNode) -> Result<()> {
    let app = router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Starting metrics server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind metrics server")?;

    axum::serve(listener, app)
        .await
        .context("Metrics server error")?;

    Ok(())
}

/// Metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn list_handler(State(node): State<SharedNode>) -> Response {
    let node = node.read().await;
    Json(node.manager.all_rate_limits()).into_response()
}

async fn get_handler(
    State(node): State<SharedNode>,
    Path((channel_id, denom)): Path<(String, String)>,
) -> Response {
    let node = node.read().await;
    match node.manager.get_rate_limit(&denom, &channel_id) {
        Some(rate_limit) => Json(rate_limit).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("no rate limit for {} on {}", denom, channel_id),
        )
            .into_response(),
    }
}

async fn by_chain_handler(
    State(node): State<SharedNode>,
    Path(chain_id): Path<String>,
) -> Response {
    let node = node.read().await;
    Json(node.manager.rate_limits_by_chain_id(&chain_id, &node.host)).into_response()
}
