//! Push channel: one WebSocket per owner session.
//!
//! Authentication runs once at establishment with the same access-token
//! validation as REST calls; a socket that fails it never joins the
//! broker. After that the socket is write-mostly: the server forwards
//! broker events as JSON text frames and only reads to notice close.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::error::ApiError;
use super::interceptor::bearer_token;
use super::state::AppState;
use crate::auth::Claims;

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    /// Browser WebSocket clients cannot set headers; they pass the access
    /// token here instead.
    pub token: Option<String>,
}

/// Validate the handshake credential exactly as request-level auth does.
pub(crate) fn authenticate_channel(
    state: &AppState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)
        .or(query_token)
        .ok_or_else(|| ApiError::Unauthenticated("Missing channel credential".into()))?;

    let claims = state
        .signer
        .validate(token)
        .map_err(|_| ApiError::Unauthenticated("Invalid channel credential".into()))?;

    if !claims.is_access() {
        return Err(ApiError::Unauthenticated("Not an access token".into()));
    }

    Ok(claims)
}

#[instrument(skip_all, fields(route = "channel"))]
pub async fn open_channel(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<ChannelQuery>,
) -> Result<Response, ApiError> {
    let claims = authenticate_channel(&state, &headers, query.token.as_deref())?;
    Ok(ws.on_upgrade(move |socket| run_session(state, claims, socket)))
}

async fn run_session(state: AppState, claims: Claims, mut socket: WebSocket) {
    let (session_id, mut events) = state.broker.bind(&claims.sub).await;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Ok(frame) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum; other client frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!(account_id = %claims.sub, session_id, "Channel session ended");
    state.broker.unbind(&claims.sub, session_id).await;
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::server::test_helpers::test_state;
    use axum::http::HeaderValue;
    use axum::http::header;

    #[tokio::test]
    async fn header_credential_accepted() {
        let (state, _dir) = test_state().await;
        let (token, _) = state.signer.issue_access("a1", "alice").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::try_from(format!("Bearer {token}")).unwrap(),
        );

        let claims = authenticate_channel(&state, &headers, None).unwrap();
        assert_eq!(claims.sub, "a1");
    }

    #[tokio::test]
    async fn query_token_accepted() {
        let (state, _dir) = test_state().await;
        let (token, _) = state.signer.issue_access("a1", "alice").unwrap();

        let claims = authenticate_channel(&state, &HeaderMap::new(), Some(&token)).unwrap();
        assert_eq!(claims.sub, "a1");
    }

    #[tokio::test]
    async fn missing_credential_rejected() {
        let (state, _dir) = test_state().await;
        let err = authenticate_channel(&state, &HeaderMap::new(), None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn refresh_token_rejected_for_channel() {
        let (state, _dir) = test_state().await;
        let (token, _) = state.signer.issue_refresh("a1", "alice").unwrap();

        let err = authenticate_channel(&state, &HeaderMap::new(), Some(&token)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }
}
