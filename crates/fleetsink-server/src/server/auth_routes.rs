//! Account registration, login, and refresh-token rotation.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{TokenSigner, password};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// Issue an access/refresh pair and persist the refresh token's hash.
async fn issue_session(
    state: &AppState,
    account_id: &str,
    username: &str,
) -> Result<SessionResponse, ApiError> {
    let (access_token, expires_in_secs) = state
        .signer
        .issue_access(account_id, username)
        .map_err(|e| ApiError::Storage(format!("Token creation failed: {e}")))?;

    let (refresh_token, refresh_exp) = state
        .signer
        .issue_refresh(account_id, username)
        .map_err(|e| ApiError::Storage(format!("Token creation failed: {e}")))?;

    let token_id = uuid::Uuid::new_v4().to_string();
    let token_hash = TokenSigner::hash_token(&refresh_token);
    state
        .db
        .create_auth_token(&token_id, account_id, &token_hash, refresh_exp)
        .await?;

    Ok(SessionResponse {
        account_id: account_id.to_string(),
        access_token,
        refresh_token,
        expires_in_secs,
    })
}

#[instrument(skip_all, fields(route = "auth/register"))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.username.len() < 3 {
        return Err(ApiError::InvalidInput(
            "Username must be at least 3 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::InvalidInput(
            "Password must be at least 8 characters".into(),
        ));
    }

    if state.db.get_account_by_username(&req.username).await.is_ok() {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::Storage(format!("Password hashing failed: {e}")))?;

    let account_id = uuid::Uuid::new_v4().to_string();
    state
        .db
        .create_account(&account_id, &req.username, &hash)
        .await?;

    info!(account_id = %account_id, username = %req.username, "Account registered");

    let session = issue_session(&state, &account_id, &req.username).await?;
    Ok(Json(session))
}

#[instrument(skip_all, fields(route = "auth/login"))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let account = state
        .db
        .get_account_by_username(&req.username)
        .await
        .map_err(|_| ApiError::Unauthenticated("Invalid credentials".into()))?;

    let valid = password::verify_password(&req.password, &account.password_hash)
        .map_err(|e| ApiError::Storage(format!("Password verification failed: {e}")))?;

    if !valid {
        warn!(username = %req.username, "Failed login attempt");
        return Err(ApiError::Unauthenticated("Invalid credentials".into()));
    }

    info!(account_id = %account.id, username = %account.username, "Account logged in");

    let session = issue_session(&state, &account.id, &account.username).await?;
    Ok(Json(session))
}

#[instrument(skip_all, fields(route = "auth/refresh"))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let claims = state
        .signer
        .validate(&req.refresh_token)
        .map_err(|_| ApiError::Unauthenticated("Invalid refresh token".into()))?;

    if !claims.is_refresh() {
        return Err(ApiError::InvalidInput("Not a refresh token".into()));
    }

    let token_hash = TokenSigner::hash_token(&req.refresh_token);
    let stored = state
        .db
        .get_auth_token_by_hash(&token_hash)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Refresh token revoked or expired".into()))?;

    // Rotation: the presented token is spent
    state.db.revoke_auth_token(&stored.id).await?;

    let session = issue_session(&state, &claims.sub, &claims.username).await?;
    Ok(Json(session))
}

#[instrument(skip_all, fields(route = "auth/logout"))]
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token_hash = TokenSigner::hash_token(&req.refresh_token);
    let stored = state.db.get_auth_token_by_hash(&token_hash).await?;

    let revoked = if let Some(token) = stored {
        state.db.revoke_auth_token(&token.id).await?
    } else {
        false
    };

    Ok(Json(LogoutResponse { revoked }))
}
