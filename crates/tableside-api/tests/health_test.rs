//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::spawn_app().await.app;

    let (status, json) = common::get_json(app, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::spawn_app().await.app;

    let (status, _) = common::get_json(app, "/api/v1/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
