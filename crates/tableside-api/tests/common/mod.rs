//! Shared helpers for API integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tableside_api::build_router;
use tableside_api::state::AppState;
use tableside_core::clock::{Clock, SystemClock};
use tableside_relay::{Relay, RelayConfig};
use tableside_test_support::MemoryJournal;

/// Engine key wired into every test app.
pub const ENGINE_KEY: &str = "test-engine-key";

/// A fully wired test application with direct access to the relay.
pub struct TestApp {
    /// The router under test.
    pub app: Router,
    /// The relay behind the router, for arranging state directly.
    pub relay: Arc<Relay>,
    /// The Host's bearer token.
    pub host_token: String,
}

/// Builds a test app over an in-memory journal. The engine poll window is
/// short so long-poll timeout tests stay fast.
pub async fn spawn_app() -> TestApp {
    let journal = Arc::new(MemoryJournal::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (relay, host_token) = Relay::open_session("GM", RelayConfig::default(), journal, clock)
        .await
        .unwrap();
    let relay = Arc::new(relay);

    let state = AppState::new(
        Arc::clone(&relay),
        ENGINE_KEY.to_string(),
        Duration::from_millis(50),
    );
    TestApp {
        app: build_router(state),
        relay,
        host_token: host_token.value,
    }
}

/// Sends a JSON POST with an optional bearer token and returns status + body.
pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Sends a GET with an optional bearer token and returns status + body.
pub async fn get_json(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
