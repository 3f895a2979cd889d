//! Liveness endpoint, unauthenticated.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of a liveness check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving.
    pub status: String,
    /// The running relay version.
    pub version: String,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Router for the liveness endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
