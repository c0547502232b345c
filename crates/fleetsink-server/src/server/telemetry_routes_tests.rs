//! Tests for location/notification ingestion and the live fan-out they
//! trigger.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use super::test_helpers::{seed_owner, send_json, test_app};
use fleetsink_core::Event;

#[tokio::test]
async fn location_ingest_then_list() {
    let (app, state, _dir) = test_app().await;
    let (_alice_id, alice) = seed_owner(&state, "alice").await;

    send_json(
        &app,
        "POST",
        "/api/devices/claim",
        Some(&alice),
        Some(json!({"device_uid": "dev-1"})),
    )
    .await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/location",
        None,
        Some(json!({"device_uid": "dev-1", "lat": 38.72, "lon": -9.14, "accuracy": 8.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, fixes) = send_json(
        &app,
        "GET",
        "/api/locations?device_uid=dev-1",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fixes = fixes.as_array().unwrap();
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0]["lat"], 38.72);
}

#[tokio::test]
async fn notification_ingest_then_list() {
    let (app, state, _dir) = test_app().await;
    let (_alice_id, alice) = seed_owner(&state, "alice").await;

    send_json(
        &app,
        "POST",
        "/api/devices/claim",
        Some(&alice),
        Some(json!({"device_uid": "dev-1"})),
    )
    .await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/notification",
        None,
        Some(json!({"device_uid": "dev-1", "source": "com.example.mail", "message": "new mail"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, events) = send_json(
        &app,
        "GET",
        "/api/notifications?device_uid=dev-1",
        Some(&alice),
        None,
    )
    .await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["message"], "new mail");
}

#[tokio::test]
async fn unclaimed_device_telemetry_rejected() {
    let (app, _state, _dir) = test_app().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/location",
        None,
        Some(json!({"device_uid": "dev-ghost", "lat": 0.0, "lon": 0.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn telemetry_listing_requires_ownership() {
    let (app, state, _dir) = test_app().await;
    let (_alice_id, alice) = seed_owner(&state, "alice").await;
    let (_bob_id, bob) = seed_owner(&state, "bob").await;

    send_json(
        &app,
        "POST",
        "/api/devices/claim",
        Some(&alice),
        Some(json!({"device_uid": "dev-1"})),
    )
    .await;

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/locations?device_uid=dev-1",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ingest_pushes_events_in_publish_order() {
    let (app, state, _dir) = test_app().await;
    let (alice_id, alice) = seed_owner(&state, "alice").await;

    send_json(
        &app,
        "POST",
        "/api/devices/claim",
        Some(&alice),
        Some(json!({"device_uid": "dev-1"})),
    )
    .await;

    let (_session, mut events) = state.broker.bind(&alice_id).await;

    send_json(
        &app,
        "POST",
        "/api/location",
        None,
        Some(json!({"device_uid": "dev-1", "lat": 1.0, "lon": 1.0, "recorded_at": 1})),
    )
    .await;
    send_json(
        &app,
        "POST",
        "/api/notification",
        None,
        Some(json!({"device_uid": "dev-1", "message": "after", "recorded_at": 2})),
    )
    .await;

    match events.recv().await.unwrap() {
        Event::Location { recorded_at, .. } => assert_eq!(recorded_at, 1),
        other => panic!("expected location first, got {other:?}"),
    }
    match events.recv().await.unwrap() {
        Event::Notification { message, .. } => assert_eq!(message, "after"),
        other => panic!("expected notification second, got {other:?}"),
    }
}

#[tokio::test]
async fn touch_updates_liveness_even_on_rejected_ingest() {
    let (app, state, _dir) = test_app().await;

    // Rejected (unclaimed) ingest still records first contact
    send_json(
        &app,
        "POST",
        "/api/location",
        None,
        Some(json!({"device_uid": "dev-new", "lat": 0.0, "lon": 0.0})),
    )
    .await;

    let device = state.db.get_device_by_uid("dev-new").await.unwrap();
    assert!(device.owner_id.is_none());
    assert!(device.last_seen > 0);
}
