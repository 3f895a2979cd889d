//! Routes for session membership.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tableside_core::identity::Identity;

use crate::error::ApiError;
use crate::routes::bearer_token;
use crate::state::AppState;

/// Request body for POST /participants.
#[derive(Debug, Deserialize)]
pub struct AdmitRequest {
    /// Display label for the new participant.
    pub label: String,
    /// The in-game entity the participant will control.
    pub owned_entity: Option<Uuid>,
}

/// Response body for POST /participants.
#[derive(Debug, Serialize)]
pub struct AdmitResponse {
    /// The registered identity.
    pub identity: Identity,
    /// The participant's bearer token, shown once at admission.
    pub token: String,
}

/// POST /participants (Host only)
#[instrument(skip(state, headers, request), fields(label = %request.label))]
async fn admit_participant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdmitRequest>,
) -> Result<(StatusCode, Json<AdmitResponse>), ApiError> {
    let host_token = bearer_token(&headers)?;
    let (identity, token) =
        state
            .relay
            .admit_participant(host_token, &request.label, request.owned_entity)?;

    info!(identity = %identity.key, "participant admitted");
    Ok((
        StatusCode::CREATED,
        Json(AdmitResponse {
            identity,
            token: token.value,
        }),
    ))
}

/// Returns the router for session membership.
pub fn router() -> Router<AppState> {
    Router::new().route("/participants", post(admit_participant))
}
