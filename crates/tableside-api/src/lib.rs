//! Axum HTTP/WebSocket server for the Tableside session relay.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/actions", routes::actions::router())
        .nest("/api/v1/live", routes::live::router())
        .nest("/api/v1/engine", routes::engine::router())
        .nest("/api/v1/session", routes::session::router())
        .nest("/api/v1/admin", routes::admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
