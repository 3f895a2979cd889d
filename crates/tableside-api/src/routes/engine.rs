//! Routes for the external decision engine.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tableside_core::action::Action;
use tableside_core::error::AuthError;
use tableside_core::outcome::Outcome;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the engine key issued at startup.
pub const ENGINE_KEY_HEADER: &str = "x-engine-key";

/// Request body for POST /resolve.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// The InFlight action to resolve.
    pub action_id: Uuid,
    /// The engine's outcome for that action.
    pub outcome: Outcome,
}

/// Response body for POST /resolve.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// The resolved action.
    pub action_id: Uuid,
}

fn require_engine_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(ENGINE_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    if presented == state.engine_key.as_ref() {
        Ok(())
    } else {
        Err(AuthError::UnknownToken.into())
    }
}

/// POST /next — long-poll for the next action; 204 when none arrives within
/// the poll window.
#[instrument(skip(state, headers))]
async fn next_action(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_engine_key(&state, &headers)?;

    match tokio::time::timeout(state.engine_poll_timeout, state.relay.take_next()).await {
        Ok(action) => {
            let action: Action = action?;
            info!(action_id = %action.id, "handed action to engine");
            Ok(Json(action).into_response())
        }
        Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /resolve
#[instrument(skip(state, headers, request), fields(action_id = %request.action_id))]
async fn resolve_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    require_engine_key(&state, &headers)?;
    state.relay.resolve(request.action_id, request.outcome).await?;
    Ok(Json(ResolveResponse {
        action_id: request.action_id,
    }))
}

/// Returns the router for the engine interface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/next", post(next_action))
        .route("/resolve", post(resolve_action))
}
