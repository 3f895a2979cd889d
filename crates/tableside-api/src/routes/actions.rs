//! Routes for action submission and status.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use tableside_relay::SubmissionReceipt;

use crate::error::ApiError;
use crate::routes::bearer_token;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Opaque action text forwarded to the decision engine.
    pub payload: String,
}

/// Response body for POST /. A held submission is acknowledged explicitly so
/// the submitter knows it will be sent when their turn arrives.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    /// Admitted into the queue.
    Queued {
        /// The admitted action.
        action_id: Uuid,
        /// 1-based position among pending actions.
        position: usize,
    },
    /// Buffered until the submitter's turn.
    Held {
        /// 1-based position within the submitter's holding buffer.
        position: usize,
    },
}

/// Response body for GET /{id}.
#[derive(Debug, Serialize)]
pub struct ActionStatusResponse {
    /// Lifecycle status: `pending`, `in_flight`, or `resolved`.
    pub status: String,
}

/// POST /
#[instrument(skip(state, headers, request))]
async fn submit_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let token = bearer_token(&headers)?;
    let receipt = state.relay.submit(token, &request.payload).await?;

    let response = match receipt {
        SubmissionReceipt::Queued {
            action_id,
            position,
        } => {
            info!(%action_id, position, "action queued");
            SubmitResponse::Queued {
                action_id,
                position,
            }
        }
        SubmissionReceipt::Held { position } => SubmitResponse::Held { position },
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /{id}
#[instrument(skip(state, headers))]
async fn action_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(action_id): Path<Uuid>,
) -> Result<Json<ActionStatusResponse>, ApiError> {
    let token = bearer_token(&headers)?;
    let status = state.relay.action_status(token, action_id).await?;
    Ok(Json(ActionStatusResponse {
        status: status.to_string(),
    }))
}

/// Returns the router for action submission and status.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_action))
        .route("/{id}", get(action_status))
}
