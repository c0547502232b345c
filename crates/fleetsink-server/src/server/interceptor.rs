//! JWT validation middleware for owner-facing routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;
use super::state::AppState;

/// Pull the raw token out of an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validate the access token and stash its claims in request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthenticated("Missing authorization header".into()))?;

    let claims = state
        .signer
        .validate(token)
        .map_err(|_| ApiError::Unauthenticated("Invalid token".into()))?;

    if !claims.is_access() {
        return Err(ApiError::Unauthenticated("Not an access token".into()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
