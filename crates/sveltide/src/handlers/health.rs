//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Render pool stats (fast, passive stats)
//! - `/readyz` - Readiness probe (active render check)

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sveltide_render::{HealthStatus, Renderer};

pub fn health_router<S>(renderer: Arc<Renderer>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(renderer)
}

/// GET /livez - Basic liveness probe.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Render pool stats (passive stats, no render).
#[axum::debug_handler]
pub async fn healthz(State(renderer): State<Arc<Renderer>>) -> Response {
    (StatusCode::OK, Json(renderer.stats())).into_response()
}

/// GET /readyz - Readiness probe (active render health check).
///
/// Renders the default error page on one worker.
/// Returns 200 with health status if healthy, 503 if unhealthy.
#[axum::debug_handler]
pub async fn readyz(State(renderer): State<Arc<Renderer>>) -> Response {
    match renderer.health_check().await {
        Ok(status) if status.healthy => (StatusCode::OK, Json(status)).into_response(),
        Ok(status) => (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus {
                healthy: false,
                latency_ms: 0,
                worker_idx: 0,
                stats: renderer.stats(),
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}
