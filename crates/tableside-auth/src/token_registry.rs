//! Bearer-token issuance, validation, and revocation.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tableside_core::clock::Clock;
use tableside_core::error::AuthError;
use uuid::Uuid;

/// A bearer credential bound to exactly one identity.
#[derive(Debug, Clone)]
pub struct Token {
    /// The opaque token value presented by clients.
    pub value: String,
    /// The identity this token authenticates.
    pub identity: Uuid,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// Whether the token has been revoked.
    pub revoked: bool,
}

#[derive(Debug)]
struct TokenEntry {
    identity: Uuid,
    revoked: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Every token ever issued, keyed by value. Revoked entries are kept so
    /// a replayed stale token is rejected as revoked, not unknown.
    by_value: HashMap<String, TokenEntry>,
    /// The single active token value per identity.
    active: HashMap<Uuid, String>,
}

/// Issues, validates, and revokes per-identity bearer tokens.
///
/// Invariant: at most one active token per identity; issuing a replacement
/// atomically revokes the predecessor, and revocation is visible to the next
/// `validate` call with no caching lag.
pub struct TokenRegistry {
    clock: Arc<dyn Clock>,
    inner: RwLock<RegistryState>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(RegistryState::default()),
        }
    }

    /// Issues a fresh token for `identity`, revoking any prior active token
    /// in the same critical section.
    pub fn issue(&self, identity: Uuid) -> Token {
        let value = fresh_token_value();
        let issued_at = self.clock.now();

        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = state.active.insert(identity, value.clone()) {
            if let Some(entry) = state.by_value.get_mut(&previous) {
                entry.revoked = true;
            }
            tracing::debug!(%identity, "revoked prior token on reissue");
        }
        state.by_value.insert(
            value.clone(),
            TokenEntry {
                identity,
                revoked: false,
            },
        );

        Token {
            value,
            identity,
            issued_at,
            revoked: false,
        }
    }

    /// Validates a presented token value, returning the owning identity.
    ///
    /// Fails closed: unknown and revoked values are always rejected, never
    /// resolved to a stale identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownToken` or `AuthError::RevokedToken`.
    pub fn validate(&self, value: &str) -> Result<Uuid, AuthError> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match state.by_value.get(value) {
            None => Err(AuthError::UnknownToken),
            Some(entry) if entry.revoked => Err(AuthError::RevokedToken),
            Some(entry) => Ok(entry.identity),
        }
    }

    /// Revokes the active token for `identity` without issuing a
    /// replacement. Returns whether an active token existed.
    pub fn revoke(&self, identity: Uuid) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match state.active.remove(&identity) {
            Some(value) => {
                if let Some(entry) = state.by_value.get_mut(&value) {
                    entry.revoked = true;
                }
                tracing::info!(%identity, "token revoked");
                true
            }
            None => false,
        }
    }
}

/// Generates an unguessable token value: 32 random bytes, hex-encoded.
fn fresh_token_value() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
