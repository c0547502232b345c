//! Shared test helpers for the HTTP route test modules.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::TokenSigner;
use crate::blobstore::BlobStore;
use crate::broker::SessionBroker;
use crate::devices::DeviceDirectory;
use crate::server::{AppState, router};
use crate::storage::FleetDatabase;

/// Build an [`AppState`] over an in-memory database and a temp blob root.
pub async fn test_state() -> (AppState, tempfile::TempDir) {
    let db = FleetDatabase::open_in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        directory: DeviceDirectory::new(db.clone()),
        blobs: Arc::new(BlobStore::open(db.clone(), dir.path()).unwrap()),
        broker: SessionBroker::new(),
        signer: Arc::new(TokenSigner::new(b"test-secret", 3600, 86400)),
        db,
    };
    (state, dir)
}

/// Full router plus its state for end-to-end request tests.
pub async fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let (state, dir) = test_state().await;
    (router(state.clone()), state, dir)
}

/// Seed an account directly and mint an access token for it, skipping the
/// registration endpoint (auth flow has its own tests).
pub async fn seed_owner(state: &AppState, username: &str) -> (String, String) {
    let account_id = uuid::Uuid::new_v4().to_string();
    state
        .db
        .create_account(&account_id, username, "unused-hash")
        .await
        .unwrap();
    let (token, _) = state.signer.issue_access(&account_id, username).unwrap();
    (account_id, token)
}

/// Fire a JSON request at the router and decode the JSON response.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Fire a raw GET and return status, headers, and body bytes (for media
/// streaming assertions).
pub async fn send_get_raw(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

const BOUNDARY: &str = "fleetsink-test-boundary";

/// Hand-rolled multipart body: `device_uid` (and optional `metadata`)
/// text fields followed by one `file` part.
pub fn multipart_upload(
    device_uid: &str,
    metadata: Option<&str>,
    filename: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"device_uid\"\r\n\r\n{device_uid}\r\n"
        )
        .as_bytes(),
    );
    if let Some(metadata) = metadata {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\n{metadata}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// POST a multipart upload and decode the JSON response.
pub async fn send_upload(
    app: &Router,
    device_uid: &str,
    metadata: Option<&str>,
    filename: &str,
    data: &[u8],
) -> (StatusCode, Value) {
    let (content_type, body) = multipart_upload(device_uid, metadata, filename, data);
    let request = Request::builder()
        .method("POST")
        .uri("/api/media/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
