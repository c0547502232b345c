//! fleetsink Server Library
//!
//! Core functionality for the fleetsink backend:
//! - SQLite storage for accounts, devices, commands, media, and telemetry
//! - JWT authentication and password hashing
//! - Device directory (identifier-to-owner resolution, claims, liveness)
//! - Durable per-device command queue with poll/ack handoff
//! - Content-addressed blob store with streaming ingest
//! - Session broker for live push fan-out
//! - axum HTTP/WebSocket surface

pub mod auth;
pub mod blobstore;
pub mod broker;
pub mod devices;
pub mod server;
pub mod storage;
