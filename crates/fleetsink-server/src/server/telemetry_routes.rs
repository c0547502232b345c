//! Plain telemetry ingestion and listing: location fixes and
//! notification events.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::Claims;
use crate::storage::{Device, DeviceNotification, LocationFix};
use fleetsink_core::Event;
use fleetsink_core::db::unix_timestamp;

const DEFAULT_LIST_LIMIT: u32 = 200;
const MAX_LIST_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct LocationIngest {
    pub device_uid: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub recorded_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationIngest {
    pub device_uid: String,
    #[serde(default)]
    pub source: String,
    pub message: String,
    #[serde(default)]
    pub recorded_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryListQuery {
    pub device_uid: String,
    pub limit: Option<u32>,
}

/// Resolve a claimed device for a device-facing ingest call, touching it
/// first so liveness updates even when the deeper write fails.
async fn resolve_claimed(state: &AppState, device_uid: &str) -> Result<(Device, String), ApiError> {
    if device_uid.is_empty() {
        return Err(ApiError::InvalidInput("device_uid required".into()));
    }

    state.directory.touch(device_uid).await;

    let device = state.directory.resolve_owned(device_uid, None).await?;
    let Some(owner_id) = device.owner_id.clone() else {
        return Err(ApiError::Forbidden(format!(
            "device {device_uid} is unclaimed, telemetry is not accepted"
        )));
    };
    Ok((device, owner_id))
}

#[instrument(skip_all, fields(route = "location/ingest"))]
pub async fn ingest_location(
    State(state): State<AppState>,
    Json(req): Json<LocationIngest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let (_device, owner_id) = resolve_claimed(&state, &req.device_uid).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let accuracy = req.accuracy.unwrap_or(0.0);
    let recorded_at = req.recorded_at.unwrap_or_else(unix_timestamp);

    state
        .db
        .create_location(
            &id,
            &req.device_uid,
            &owner_id,
            req.lat,
            req.lon,
            accuracy,
            recorded_at,
        )
        .await?;

    state
        .broker
        .publish(
            &owner_id,
            &Event::Location {
                device_uid: req.device_uid,
                lat: req.lat,
                lon: req.lon,
                accuracy,
                recorded_at,
            },
        )
        .await;

    Ok(Json(IngestResponse { ok: true, id }))
}

#[instrument(skip_all, fields(route = "notification/ingest"))]
pub async fn ingest_notification(
    State(state): State<AppState>,
    Json(req): Json<NotificationIngest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let (_device, owner_id) = resolve_claimed(&state, &req.device_uid).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let recorded_at = req.recorded_at.unwrap_or_else(unix_timestamp);

    state
        .db
        .create_notification(
            &id,
            &req.device_uid,
            &owner_id,
            &req.source,
            &req.message,
            recorded_at,
        )
        .await?;

    state
        .broker
        .publish(
            &owner_id,
            &Event::Notification {
                device_uid: req.device_uid,
                source: req.source,
                message: req.message,
                recorded_at,
            },
        )
        .await;

    Ok(Json(IngestResponse { ok: true, id }))
}

#[instrument(skip_all, fields(route = "location/list"))]
pub async fn list_locations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<TelemetryListQuery>,
) -> Result<Json<Vec<LocationFix>>, ApiError> {
    state
        .directory
        .resolve_owned(&query.device_uid, Some(&claims.sub))
        .await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let fixes = state
        .db
        .list_locations(&claims.sub, &query.device_uid, limit)
        .await?;
    Ok(Json(fixes))
}

#[instrument(skip_all, fields(route = "notification/list"))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<TelemetryListQuery>,
) -> Result<Json<Vec<DeviceNotification>>, ApiError> {
    state
        .directory
        .resolve_owned(&query.device_uid, Some(&claims.sub))
        .await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let events = state
        .db
        .list_notifications(&claims.sub, &query.device_uid, limit)
        .await?;
    Ok(Json(events))
}
