//! Command queue endpoints.
//!
//! Owners enqueue against devices they own; devices poll and ack with no
//! account credential, scoped by their hardware identifier. Delivery is
//! at-least-once: a command polled but never acked will be polled again.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::error::ApiError;
use super::state::AppState;
use crate::auth::Claims;
use crate::storage::Command;
use fleetsink_core::Metadata;

/// Largest batch a single poll may request.
pub const MAX_POLL_BATCH: u32 = 50;
/// Longest accepted ack result payload, serialized.
pub const MAX_RESULT_BYTES: usize = 8 * 1024;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub command: String,
    #[serde(default)]
    pub params: Option<Metadata>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct PollRequest {
    #[serde(default)]
    pub device_uid: String,
    #[serde(default)]
    pub max: Option<u32>,
}

/// Command as delivered to a polling device.
#[derive(Debug, Serialize)]
pub struct PolledCommand {
    pub id: String,
    pub command: String,
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub commands: Vec<PolledCommand>,
}

#[derive(Debug, Deserialize)]
pub struct AckRequest {
    #[serde(default)]
    pub device_uid: String,
    pub command_id: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Command as the owner's dashboard sees it.
#[derive(Debug, Serialize)]
pub struct CommandView {
    pub id: String,
    pub command: String,
    pub params: Value,
    pub status: String,
    pub result: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl From<Command> for CommandView {
    fn from(c: Command) -> Self {
        Self {
            params: serde_json::from_str(&c.params).unwrap_or_default(),
            id: c.id,
            command: c.command,
            status: c.status,
            result: c.result,
            created_at: c.created_at,
            completed_at: c.completed_at,
        }
    }
}

#[instrument(skip_all, fields(route = "commands/enqueue"))]
pub async fn enqueue_command(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(device_uid): Path<String>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    if req.command.is_empty() {
        return Err(ApiError::InvalidInput("command required".into()));
    }

    state
        .directory
        .resolve_owned(&device_uid, Some(&claims.sub))
        .await?;

    let id = uuid::Uuid::new_v4().to_string();
    let params_json = req.params.unwrap_or_default().to_json();
    state
        .db
        .create_command(&id, &device_uid, &claims.sub, &req.command, &params_json)
        .await?;

    info!(command_id = %id, device_uid = %device_uid, command = %req.command, "Command enqueued");

    Ok(Json(EnqueueResponse { id }))
}

#[instrument(skip_all, fields(route = "commands/list"))]
pub async fn list_device_commands(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(device_uid): Path<String>,
) -> Result<Json<Vec<CommandView>>, ApiError> {
    state
        .directory
        .resolve_owned(&device_uid, Some(&claims.sub))
        .await?;

    let commands = state.db.list_recent_commands(&device_uid, 100).await?;
    Ok(Json(commands.into_iter().map(CommandView::from).collect()))
}

/// Device-facing poll. Unknown or unclaimed identifiers get an empty list
/// rather than an error, so a device with a stale identifier does not spin
/// on hard failures.
#[instrument(skip_all, fields(route = "commands/poll"))]
pub async fn poll_commands(
    State(state): State<AppState>,
    Json(req): Json<PollRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    if req.device_uid.is_empty() {
        return Ok(Json(PollResponse { commands: Vec::new() }));
    }

    state.directory.touch(&req.device_uid).await;

    let batch = req.max.unwrap_or(MAX_POLL_BATCH).clamp(1, MAX_POLL_BATCH);
    let pending = state
        .db
        .list_pending_commands(&req.device_uid, batch)
        .await?;

    let commands = pending
        .into_iter()
        .map(|c| PolledCommand {
            params: serde_json::from_str(&c.params).unwrap_or_default(),
            id: c.id,
            command: c.command,
        })
        .collect();

    Ok(Json(PollResponse { commands }))
}

/// Device-facing ack. An id that does not match this device's pending
/// commands is silently ignored -- identifier drift must not wedge the
/// device in an error loop.
#[instrument(skip_all, fields(route = "commands/ack"))]
pub async fn ack_command(
    State(state): State<AppState>,
    Json(req): Json<AckRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    if req.command_id.is_empty() {
        return Err(ApiError::InvalidInput("command_id required".into()));
    }
    if req.result.as_ref().is_some_and(|r| r.len() > MAX_RESULT_BYTES) {
        return Err(ApiError::InvalidInput("result payload too large".into()));
    }

    state.directory.touch(&req.device_uid).await;

    let updated = state
        .db
        .ack_command(&req.device_uid, &req.command_id, req.result.as_deref())
        .await?;

    if updated {
        info!(command_id = %req.command_id, device_uid = %req.device_uid, "Command acked");
    } else {
        debug!(
            command_id = %req.command_id,
            device_uid = %req.device_uid,
            "Ack matched nothing, ignoring"
        );
    }

    Ok(Json(AckResponse { ok: true }))
}
