//! Owner-facing device claim and listing.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::Claims;
use crate::storage::Device;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub device_uid: String,
    pub label: Option<String>,
    #[serde(default)]
    pub force: bool,
}

/// Device as the dashboard sees it: `online` is derived, never stored.
#[derive(Debug, Serialize)]
pub struct DeviceView {
    pub id: String,
    pub device_uid: String,
    pub label: String,
    pub online: bool,
    pub last_seen: i64,
    pub forced: bool,
    pub pending_commands: i64,
}

impl DeviceView {
    fn new(device: Device, online: bool, pending_commands: i64) -> Self {
        Self {
            id: device.id,
            device_uid: device.device_uid,
            label: device.label,
            online,
            last_seen: device.last_seen,
            forced: device.forced != 0,
            pending_commands,
        }
    }
}

#[instrument(skip_all, fields(route = "devices/claim"))]
pub async fn claim_device(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<DeviceView>, ApiError> {
    if req.device_uid.is_empty() {
        return Err(ApiError::InvalidInput("device_uid required".into()));
    }

    let device = state
        .directory
        .claim(
            &req.device_uid,
            &claims.sub,
            req.label.as_deref(),
            req.force,
        )
        .await?;

    let pending = state.db.count_pending_commands(&device.device_uid).await?;
    let online = state.directory.is_online(&device);
    Ok(Json(DeviceView::new(device, online, pending)))
}

#[instrument(skip_all, fields(route = "devices/list"))]
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<DeviceView>>, ApiError> {
    let devices = state.db.list_devices(&claims.sub).await?;

    let mut views = Vec::with_capacity(devices.len());
    for device in devices {
        let pending = state.db.count_pending_commands(&device.device_uid).await?;
        let online = state.directory.is_online(&device);
        views.push(DeviceView::new(device, online, pending));
    }

    Ok(Json(views))
}
