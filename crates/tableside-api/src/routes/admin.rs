//! Host administration routes. Every handler requires the Host's token;
//! role enforcement lives in the relay.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tableside_core::turn::TurnMode;

use crate::error::ApiError;
use crate::routes::bearer_token;
use crate::state::AppState;

/// Request body for POST /tokens/refresh and /tokens/revoke.
#[derive(Debug, Deserialize)]
pub struct TokenTarget {
    /// The identity whose token is affected.
    pub identity: Uuid,
}

/// Response body for POST /tokens/refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// The identity the new token authenticates.
    pub identity: Uuid,
    /// The replacement bearer token; the previous one is now revoked.
    pub token: String,
}

/// Request body for POST /encounter/begin.
#[derive(Debug, Deserialize)]
pub struct BeginEncounterRequest {
    /// Initiative order; every key must be a registered identity.
    pub order: Vec<Uuid>,
    /// Turn discipline for the phase.
    pub mode: TurnMode,
}

/// Response body for POST /encounter/begin and /turn/advance.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// The identity whose turn it now is; `None` in Simultaneous mode.
    pub active: Option<Uuid>,
}

/// Request body for POST /queue/release.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    /// The stuck InFlight action to return to Pending.
    pub action_id: Uuid,
}

/// POST /tokens/refresh
#[instrument(skip(state, headers, request), fields(identity = %request.identity))]
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TokenTarget>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let host_token = bearer_token(&headers)?;
    let token = state.relay.refresh_token(host_token, request.identity)?;
    info!(identity = %request.identity, "token refreshed");
    Ok(Json(RefreshResponse {
        identity: request.identity,
        token: token.value,
    }))
}

/// POST /tokens/revoke
#[instrument(skip(state, headers, request), fields(identity = %request.identity))]
async fn revoke_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TokenTarget>,
) -> Result<StatusCode, ApiError> {
    let host_token = bearer_token(&headers)?;
    state.relay.revoke_token(host_token, request.identity)?;
    info!(identity = %request.identity, "token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /encounter/begin
#[instrument(skip(state, headers, request))]
async fn begin_encounter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BeginEncounterRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let host_token = bearer_token(&headers)?;
    state
        .relay
        .begin_encounter(host_token, request.order, request.mode)
        .await?;
    Ok(Json(TurnResponse {
        active: state.relay.active_identity(),
    }))
}

/// POST /encounter/end
#[instrument(skip(state, headers))]
async fn end_encounter(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let host_token = bearer_token(&headers)?;
    state.relay.end_encounter(host_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /turn/advance
#[instrument(skip(state, headers))]
async fn advance_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TurnResponse>, ApiError> {
    let host_token = bearer_token(&headers)?;
    let active = state.relay.advance_turn(host_token).await?;
    Ok(Json(TurnResponse {
        active: Some(active),
    }))
}

/// POST /connections/{id}/drop
#[instrument(skip(state, headers))]
async fn drop_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let host_token = bearer_token(&headers)?;
    state.relay.drop_connection(host_token, connection_id)?;
    info!(%connection_id, "connection dropped by host");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/release
#[instrument(skip(state, headers, request), fields(action_id = %request.action_id))]
async fn release_stuck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReleaseRequest>,
) -> Result<StatusCode, ApiError> {
    let host_token = bearer_token(&headers)?;
    state.relay.release_stuck(host_token, request.action_id).await?;
    info!(action_id = %request.action_id, "stuck action released");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for host administration.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens/refresh", post(refresh_token))
        .route("/tokens/revoke", post(revoke_token))
        .route("/encounter/begin", post(begin_encounter))
        .route("/encounter/end", post(end_encounter))
        .route("/turn/advance", post(advance_turn))
        .route("/connections/{id}/drop", post(drop_connection))
        .route("/queue/release", post(release_stuck))
}
