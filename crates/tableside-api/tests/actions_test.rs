//! Integration tests for action submission and status.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_submit_without_token_returns_401() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        None,
        &json!({ "payload": "attack" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "missing_token");
}

#[tokio::test]
async fn test_submit_returns_202_with_queue_position() {
    let test_app = common::spawn_app().await;
    let (_, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&token.value),
        &json!({ "payload": "attack the gate" }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "queued");
    assert_eq!(json["position"], 1);
    Uuid::parse_str(json["action_id"].as_str().unwrap()).unwrap();
}

#[tokio::test]
async fn test_empty_payload_returns_400() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&test_app.host_token),
        &json!({ "payload": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_observer_submit_returns_403() {
    let test_app = common::spawn_app().await;
    let observer = test_app
        .relay
        .observer_token(&test_app.host_token)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&observer.value),
        &json!({ "payload": "peek" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn test_submitter_reads_own_action_status() {
    let test_app = common::spawn_app().await;
    let (_, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();
    let (_, submitted) = common::post_json(
        test_app.app.clone(),
        "/api/v1/actions",
        Some(&token.value),
        &json!({ "payload": "attack" }),
    )
    .await;
    let action_id = submitted["action_id"].as_str().unwrap().to_owned();

    let (status, json) = common::get_json(
        test_app.app,
        &format!("/api/v1/actions/{action_id}"),
        Some(&token.value),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_action_status_is_hidden_from_other_participants() {
    let test_app = common::spawn_app().await;
    let (_, submitter) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();
    let (_, other) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Corvin", None)
        .unwrap();
    let (_, submitted) = common::post_json(
        test_app.app.clone(),
        "/api/v1/actions",
        Some(&submitter.value),
        &json!({ "payload": "attack" }),
    )
    .await;
    let action_id = submitted["action_id"].as_str().unwrap().to_owned();

    let (status, _) = common::get_json(
        test_app.app,
        &format!("/api/v1/actions/{action_id}"),
        Some(&other.value),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_action_returns_404() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::get_json(
        test_app.app,
        &format!("/api/v1/actions/{}", Uuid::new_v4()),
        Some(&test_app.host_token),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_action");
}
