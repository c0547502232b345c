//! Tests for the account auth endpoints.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use super::test_helpers::{send_json, test_app};

#[tokio::test]
async fn register_and_login() {
    let (app, _state, _dir) = test_app().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let account_id = body["account_id"].as_str().unwrap().to_string();
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
    assert_eq!(body["expires_in_secs"], 3600);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_id"], account_id);
}

#[tokio::test]
async fn login_wrong_password() {
    let (app, _state, _dir) = test_app().await;

    send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrongpassword"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let (app, _state, _dir) = test_app().await;

    send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password456"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn weak_credentials_rejected() {
    let (app, _state, _dir) = test_app().await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "al", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_rotates_and_spends_old_token() {
    let (app, _state, _dir) = test_app().await;

    let (_, registered) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    let old_refresh = registered["refresh_token"].as_str().unwrap().to_string();

    let (status, refreshed) = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refresh_token": old_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(refreshed["refresh_token"].as_str().unwrap(), old_refresh);

    // Rotation spent the old token
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refresh_token": old_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_not_accepted_for_refresh() {
    let (app, _state, _dir) = test_app().await;

    let (_, registered) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    let access = registered["access_token"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refresh_token": access})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let (app, _state, _dir) = test_app().await;

    let (_, registered) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "password123"})),
    )
    .await;
    let refresh = registered["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/logout",
        None,
        Some(json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], true);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
