//! Integration tests for host administration.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_refresh_rotates_the_token() {
    let test_app = common::spawn_app().await;
    let (identity, old) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app.clone(),
        "/api/v1/admin/tokens/refresh",
        Some(&test_app.host_token),
        &json!({ "identity": identity.key }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let new_token = json["token"].as_str().unwrap().to_owned();
    assert_ne!(new_token, old.value);

    // The old token is revoked; the new one submits.
    let (old_status, old_json) = common::post_json(
        test_app.app.clone(),
        "/api/v1/actions",
        Some(&old.value),
        &json!({ "payload": "attack" }),
    )
    .await;
    assert_eq!(old_status, StatusCode::UNAUTHORIZED);
    assert_eq!(old_json["error"], "revoked_token");

    let (new_status, _) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&new_token),
        &json!({ "payload": "attack" }),
    )
    .await;
    assert_eq!(new_status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_revoke_returns_204_and_locks_the_seat_out() {
    let test_app = common::spawn_app().await;
    let (identity, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, _) = common::post_json(
        test_app.app.clone(),
        "/api/v1/admin/tokens/revoke",
        Some(&test_app.host_token),
        &json!({ "identity": identity.key }),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let (submit_status, _) = common::post_json(
        test_app.app,
        "/api/v1/actions",
        Some(&token.value),
        &json!({ "payload": "attack" }),
    )
    .await;
    assert_eq!(submit_status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_for_unknown_identity_returns_404() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/admin/tokens/refresh",
        Some(&test_app.host_token),
        &json!({ "identity": Uuid::new_v4() }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_identity");
}

#[tokio::test]
async fn test_begin_encounter_reports_the_first_active_identity() {
    let test_app = common::spawn_app().await;
    let (brielle, _) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();
    let (corvin, _) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Corvin", None)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/admin/encounter/begin",
        Some(&test_app.host_token),
        &json!({ "order": [corvin.key, brielle.key], "mode": "sequential" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], json!(corvin.key));
}

#[tokio::test]
async fn test_advance_without_a_phase_returns_409() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/admin/turn/advance",
        Some(&test_app.host_token),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "no_active_phase");
}

#[tokio::test]
async fn test_end_encounter_returns_204() {
    let test_app = common::spawn_app().await;
    let (brielle, _) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();
    test_app
        .relay
        .begin_encounter(
            &test_app.host_token,
            vec![brielle.key],
            tableside_core::turn::TurnMode::Sequential,
        )
        .await
        .unwrap();

    let (status, _) = common::post_json(
        test_app.app,
        "/api/v1/admin/encounter/end",
        Some(&test_app.host_token),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_drop_unknown_connection_returns_404() {
    let test_app = common::spawn_app().await;

    let (status, json) = common::post_json(
        test_app.app,
        &format!("/api/v1/admin/connections/{}/drop", Uuid::new_v4()),
        Some(&test_app.host_token),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_connection");
}

#[tokio::test]
async fn test_release_of_a_pending_action_returns_409() {
    let test_app = common::spawn_app().await;
    let (_, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();
    let receipt = test_app.relay.submit(&token.value, "attack").await.unwrap();
    let tableside_relay::SubmissionReceipt::Queued { action_id, .. } = receipt else {
        panic!("expected Queued");
    };

    // Not InFlight, so there is nothing to release.
    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/admin/queue/release",
        Some(&test_app.host_token),
        &json!({ "action_id": action_id }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid_transition");
}

#[tokio::test]
async fn test_admin_routes_reject_non_host_tokens() {
    let test_app = common::spawn_app().await;
    let (_, token) = test_app
        .relay
        .admit_participant(&test_app.host_token, "Brielle", None)
        .unwrap();

    let (status, json) = common::post_json(
        test_app.app,
        "/api/v1/admin/tokens/revoke",
        Some(&token.value),
        &json!({ "identity": Uuid::new_v4() }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}
