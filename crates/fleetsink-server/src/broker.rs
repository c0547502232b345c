//! Session broker: live push-channel registry keyed by account.
//!
//! Each connected WebSocket binds one session; publishing an event walks
//! the owning account's sessions and hands the event to each session's
//! bounded queue. Everything here is best-effort and non-blocking: a slow
//! session drops events rather than stalling the ingestion write path,
//! and an account with no bound session simply hears nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use fleetsink_core::Event;

/// Per-session queue depth before events are dropped.
pub const SESSION_QUEUE_CAPACITY: usize = 64;

/// Identifier for one bound session, unique for the process lifetime.
pub type SessionId = u64;

struct BoundSession {
    id: SessionId,
    tx: mpsc::Sender<Event>,
}

/// Thread-safe registry of live sessions grouped by account.
pub struct SessionBroker {
    sessions: RwLock<HashMap<String, Vec<BoundSession>>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
}

impl SessionBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
        })
    }

    /// Bind a new session for an account; the receiver half feeds the
    /// session's WebSocket send loop.
    pub async fn bind(&self, account_id: &str) -> (SessionId, mpsc::Receiver<Event>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);

        self.sessions
            .write()
            .await
            .entry(account_id.to_string())
            .or_default()
            .push(BoundSession { id, tx });

        info!(account_id, session_id = id, "Push session bound");
        (id, rx)
    }

    /// Remove a session on disconnect. Idempotent: unbinding an unknown
    /// session is a no-op.
    pub async fn unbind(&self, account_id: &str, session_id: SessionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(bound) = sessions.get_mut(account_id) {
            bound.retain(|s| s.id != session_id);
            if bound.is_empty() {
                sessions.remove(account_id);
            }
            info!(account_id, session_id, "Push session unbound");
        }
    }

    /// Deliver an event to every session bound to `account_id`, in bind
    /// order. Returns how many sessions accepted it.
    pub async fn publish(&self, account_id: &str, event: &Event) -> usize {
        let sessions = self.sessions.read().await;
        let Some(bound) = sessions.get(account_id) else {
            debug!(account_id, kind = event.kind(), "No bound session, event dropped");
            return 0;
        };

        let mut delivered = 0;
        for session in bound {
            match session.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        account_id,
                        session_id = session.id,
                        kind = event.kind(),
                        dropped_total = total,
                        "Session queue full, event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Receiver already gone; unbind will clean the entry up.
                    debug!(account_id, session_id = session.id, "Session closed mid-publish");
                }
            }
        }
        delivered
    }

    /// Total bound sessions across all accounts.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.values().map(Vec::len).sum()
    }

    /// Events dropped to backpressure since process start.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
