//! Data models for fleetsink storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthToken {
    pub id: String,
    pub account_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}

/// One row per hardware identifier. `owner_id` is `None` until the device
/// is claimed; `forced` records that ownership was reassigned with force.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub device_uid: String,
    pub label: String,
    pub owner_id: Option<String>,
    pub forced: i64,
    pub created_at: i64,
    pub last_seen: i64,
}

pub mod command_status {
    pub const PENDING: &str = "pending";
    pub const DONE: &str = "done";
    pub const FAILED: &str = "failed";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Command {
    pub id: String,
    pub device_uid: String,
    pub issuer_id: String,
    pub command: String,
    pub params: String,
    pub status: String,
    pub result: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaObject {
    pub id: String,
    pub account_id: String,
    pub device_uid: String,
    pub filename: String,
    pub content_type: String,
    pub length: i64,
    pub digest: String,
    pub metadata: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocationFix {
    pub id: String,
    pub device_uid: String,
    pub account_id: String,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub recorded_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceNotification {
    pub id: String,
    pub device_uid: String,
    pub account_id: String,
    pub source: String,
    pub message: String,
    pub recorded_at: i64,
    pub created_at: i64,
}
