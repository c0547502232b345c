//! fleetsink Core Library
//!
//! Shared functionality for fleetsink components:
//! - SQLite pool helpers and shared database error type
//! - Typed push-channel event union
//! - Bounded metadata maps for commands and media
//! - Tracing/logging initialization

pub mod db;
pub mod events;
pub mod metadata;
pub mod tracing_init;

pub use events::Event;
pub use metadata::{Metadata, MetadataError};
