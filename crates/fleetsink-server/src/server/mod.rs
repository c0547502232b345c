//! HTTP surface for the fleetsink server.
//!
//! Two kinds of inbound traffic share the router: device-facing calls
//! (no account credential, scoped by hardware identifier) and
//! owner-facing calls (Bearer JWT, enforced by the auth middleware).

pub mod auth_routes;
pub mod channel;
pub mod command_routes;
pub mod device_routes;
pub mod error;
pub mod interceptor;
pub mod media_routes;
pub mod state;
pub mod telemetry_routes;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod auth_routes_tests;
#[cfg(test)]
mod telemetry_routes_tests;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let owner = Router::new()
        .route("/api/devices", get(device_routes::list_devices))
        .route("/api/devices/claim", post(device_routes::claim_device))
        .route(
            "/api/devices/{device_uid}/commands",
            post(command_routes::enqueue_command).get(command_routes::list_device_commands),
        )
        .route("/api/media", get(media_routes::list_media))
        .route("/api/media/{id}", get(media_routes::fetch_media))
        .route("/api/media/{id}/download", get(media_routes::download_media))
        .route("/api/locations", get(telemetry_routes::list_locations))
        .route("/api/notifications", get(telemetry_routes::list_notifications))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            interceptor::require_auth,
        ));

    let device = Router::new()
        .route("/api/commands/poll", post(command_routes::poll_commands))
        .route("/api/commands/ack", post(command_routes::ack_command))
        .route(
            "/api/media/upload",
            post(media_routes::upload_media).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/location", post(telemetry_routes::ingest_location))
        .route("/api/notification", post(telemetry_routes::ingest_notification));

    let auth = Router::new()
        .route("/api/auth/register", post(auth_routes::register))
        .route("/api/auth/login", post(auth_routes::login))
        .route("/api/auth/refresh", post(auth_routes::refresh))
        .route("/api/auth/logout", post(auth_routes::logout));

    Router::new()
        .route("/api/channel", get(channel::open_channel))
        .merge(owner)
        .merge(device)
        .merge(auth)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
