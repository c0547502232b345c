//! Typed push-channel events.
//!
//! Every telemetry write the server accepts can produce one of these
//! events, delivered live to the sessions of the owning account. The
//! `kind` tag is the wire discriminator the dashboard switches on.
//!
//! Delivery is best-effort: the broker drops events for accounts with no
//! bound session. Durability belongs to the underlying stores, not here.

use serde::{Deserialize, Serialize};

/// A live notification pushed to an owner's connected sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A media object finished ingesting and is fetchable by id.
    Media {
        id: String,
        device_uid: String,
        filename: String,
        content_type: String,
        length: i64,
    },
    /// A location fix arrived from a device.
    Location {
        device_uid: String,
        lat: f64,
        lon: f64,
        accuracy: f64,
        recorded_at: i64,
    },
    /// A notification event arrived from a device.
    Notification {
        device_uid: String,
        source: String,
        message: String,
        recorded_at: i64,
    },
}

impl Event {
    /// The wire discriminator for this event.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Media { .. } => "media",
            Self::Location { .. } => "location",
            Self::Notification { .. } => "notification",
        }
    }

    /// Device identifier the event originated from.
    pub fn device_uid(&self) -> &str {
        match self {
            Self::Media { device_uid, .. }
            | Self::Location { device_uid, .. }
            | Self::Notification { device_uid, .. } => device_uid,
        }
    }
}
