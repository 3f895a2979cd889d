//! Tableside — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tableside_core::error::{AuthError, RelayError};

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `RelayError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(RelayError::Auth(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            RelayError::Auth(AuthError::MissingToken) => {
                (StatusCode::UNAUTHORIZED, "missing_token")
            }
            RelayError::Auth(AuthError::UnknownToken) => {
                (StatusCode::UNAUTHORIZED, "unknown_token")
            }
            RelayError::Auth(AuthError::RevokedToken) => {
                (StatusCode::UNAUTHORIZED, "revoked_token")
            }
            RelayError::Auth(AuthError::Forbidden { .. }) => (StatusCode::FORBIDDEN, "forbidden"),
            RelayError::HoldBufferFull { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "hold_buffer_full")
            }
            RelayError::UnknownAction(_) => (StatusCode::NOT_FOUND, "unknown_action"),
            RelayError::UnknownIdentity(_) => (StatusCode::NOT_FOUND, "unknown_identity"),
            RelayError::UnknownConnection(_) => (StatusCode::NOT_FOUND, "unknown_connection"),
            RelayError::DuplicateIdentity(_) => (StatusCode::CONFLICT, "duplicate_identity"),
            RelayError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            RelayError::NoActivePhase => (StatusCode::CONFLICT, "no_active_phase"),
            RelayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            RelayError::OrderingViolated(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ordering_violated")
            }
            RelayError::Journal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "journal_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
