//! Route modules organized by API surface.

pub mod actions;
pub mod admin;
pub mod engine;
pub mod health;
pub mod live;
pub mod session;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use tableside_core::error::AuthError;

use crate::error::ApiError;

/// Extracts the bearer token from the `Authorization` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::MissingToken.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tableside_core::error::RelayError;

    #[test]
    fn test_bearer_token_strips_scheme_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));

        assert_eq!(bearer_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_header_is_a_missing_token() {
        let headers = HeaderMap::new();

        let err = bearer_token(&headers).unwrap_err();

        assert!(matches!(
            err.0,
            RelayError::Auth(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_wrong_scheme_is_a_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));

        assert!(bearer_token(&headers).is_err());
    }
}
