//! Integration tests for session membership.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_admit_returns_201_with_identity_and_token() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/session/participants",
        Some(&test_app.host_token),
        &json!({ "label": "Brielle", "owned_entity": Uuid::new_v4() }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["identity"]["label"], "Brielle");
    assert_eq!(json["identity"]["role"], "Participant");
    assert!(json["identity"]["owned_entity"].is_string());
    assert!(json["token"].is_string());
}

#[tokio::test]
async fn test_admitted_token_authenticates_a_submission() {
    let test_app = common::spawn_app().await;
    let (_, admitted) = common::post_json(
        test_app.app.clone(),
        "/api/v1/session/participants",
        Some(&test_app.host_token),
        &json!({ "label": "Brielle" }),
    )
    .await;
    let token = admitted["token"].as_str().unwrap().to_owned();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&token),
        &json!({ "payload": "attack" }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "queued");
}

#[tokio::test]
async fn test_duplicate_label_returns_409() {
    let test_app = common::spawn_app().await;
    test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/session/participants",
        Some(&test_app.host_token),
        &json!({ "label": "Brielle" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "duplicate_identity");
}

#[tokio::test]
async fn test_non_host_admit_returns_403() {
    let test_app = common::spawn_app().await;
    let (_, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, _) = common::post_json(
        test_app.app,
        "/api/v1/session/participants",
        Some(&token.value),
        &json!({ "label": "Corvin" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
