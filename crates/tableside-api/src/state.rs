//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use tableside_relay::Relay;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session relay behind every endpoint.
    pub relay: Arc<Relay>,
    /// Key the external decision engine presents on `/engine` routes.
    pub engine_key: Arc<str>,
    /// How long `/engine/next` waits for work before answering 204.
    pub engine_poll_timeout: Duration,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(relay: Arc<Relay>, engine_key: String, engine_poll_timeout: Duration) -> Self {
        Self {
            relay,
            engine_key: engine_key.into(),
            engine_poll_timeout,
        }
    }
}
