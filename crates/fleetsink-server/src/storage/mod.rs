//! SQLite storage for the fleetsink server.
//!
//! Provides persistence for accounts, tokens, devices, commands, media
//! object metadata, and plain telemetry rows.

mod db;
mod models;
mod queries;
mod queries_commands;
mod queries_media;
mod queries_telemetry;


pub use db::FleetDatabase;
pub use fleetsink_core::db::DatabaseError;
pub use models::*;
pub use queries_media::MediaObjectParams;
