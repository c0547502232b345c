//! Device directory: identifier-to-owner resolution and ownership claims.
//!
//! Every other component goes through this gate before touching a device's
//! data. Claims are atomic upserts over the `device_uid` unique column;
//! there is no read-then-write window in which two accounts can both end
//! up owning one identifier.

use tracing::{info, warn};

use crate::storage::{Device, FleetDatabase};
use fleetsink_core::db::{DatabaseError, unix_timestamp};

/// Seconds since last contact after which a device reads as offline.
pub const ONLINE_THRESHOLD_SECS: i64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("unknown device {0}")]
    NotFound(String),

    #[error("device {0} is not owned by the requesting account")]
    NotOwned(String),

    #[error("device {0} is already claimed by another account")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DatabaseError> for DirectoryError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct DeviceDirectory {
    db: FleetDatabase,
    online_threshold_secs: i64,
}

impl DeviceDirectory {
    pub const fn new(db: FleetDatabase) -> Self {
        Self {
            db,
            online_threshold_secs: ONLINE_THRESHOLD_SECS,
        }
    }

    #[cfg(test)]
    pub const fn with_threshold(db: FleetDatabase, online_threshold_secs: i64) -> Self {
        Self {
            db,
            online_threshold_secs,
        }
    }

    /// Resolve a device by its hardware identifier.
    ///
    /// With `require_owner`, fails with [`DirectoryError::NotOwned`] unless
    /// the device is claimed by exactly that account.
    pub async fn resolve_owned(
        &self,
        device_uid: &str,
        require_owner: Option<&str>,
    ) -> Result<Device, DirectoryError> {
        let device = self
            .db
            .find_device_by_uid(device_uid)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(device_uid.to_string()))?;

        if let Some(account_id) = require_owner {
            if device.owner_id.as_deref() != Some(account_id) {
                return Err(DirectoryError::NotOwned(device_uid.to_string()));
            }
        }

        Ok(device)
    }

    /// Claim a device for an account.
    ///
    /// Unknown identifier: a new owned record is created. Already owned by
    /// the claimant: idempotent label/last-seen refresh. Owned by someone
    /// else: [`DirectoryError::Conflict`] unless `force`, which reassigns
    /// the record and flags it for audit.
    pub async fn claim(
        &self,
        device_uid: &str,
        account_id: &str,
        label: Option<&str>,
        force: bool,
    ) -> Result<Device, DirectoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        if self
            .db
            .create_claimed_device(&id, device_uid, label.unwrap_or(""), account_id)
            .await?
        {
            info!(device_uid, account_id, "Device claimed (new record)");
            return Ok(self.db.get_device_by_uid(device_uid).await?);
        }

        // A record exists; decide based on its current owner. Each update
        // below re-checks the owner in its WHERE clause, so a concurrent
        // claim loses cleanly rather than splitting ownership.
        let existing = self.db.get_device_by_uid(device_uid).await?;
        let label = label.unwrap_or(&existing.label);

        match existing.owner_id.as_deref() {
            None => {
                if !self.db.claim_unowned_device(device_uid, account_id, label).await? {
                    // Lost the race to another claimant
                    return Err(DirectoryError::Conflict(device_uid.to_string()));
                }
                info!(device_uid, account_id, "Unowned device claimed");
            }
            Some(owner) if owner == account_id => {
                self.db
                    .refresh_device_claim(device_uid, account_id, label)
                    .await?;
            }
            Some(prev_owner) => {
                if !force {
                    return Err(DirectoryError::Conflict(device_uid.to_string()));
                }
                if !self
                    .db
                    .reassign_device_owner(device_uid, account_id, prev_owner, label)
                    .await?
                {
                    return Err(DirectoryError::Conflict(device_uid.to_string()));
                }
                warn!(
                    device_uid,
                    prev_owner,
                    new_owner = account_id,
                    "Forced device ownership takeover"
                );
            }
        }

        Ok(self.db.get_device_by_uid(device_uid).await?)
    }

    /// Bump a device's last-seen, creating an unowned record on first
    /// contact. Failures are logged and swallowed: liveness bookkeeping
    /// must not fail the ingestion call it rides on.
    pub async fn touch(&self, device_uid: &str) {
        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.db.touch_device(&id, device_uid).await {
            warn!(device_uid, error = %e, "Failed to touch device");
        }
    }

    /// Whether a device counts as online, derived from last-seen age.
    pub fn is_online(&self, device: &Device) -> bool {
        unix_timestamp() - device.last_seen <= self.online_threshold_secs
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn setup() -> (FleetDatabase, DeviceDirectory) {
        let db = FleetDatabase::open_in_memory().await.unwrap();
        db.create_account("a1", "alice", "hash").await.unwrap();
        db.create_account("a2", "bob", "hash").await.unwrap();
        let directory = DeviceDirectory::new(db.clone());
        (db, directory)
    }

    #[tokio::test]
    async fn claim_creates_record_for_unknown_identifier() {
        let (_db, directory) = setup().await;

        let device = directory
            .claim("dev-1", "a1", Some("my phone"), false)
            .await
            .unwrap();

        assert_eq!(device.owner_id.as_deref(), Some("a1"));
        assert_eq!(device.label, "my phone");
        assert_eq!(device.forced, 0);
    }

    #[tokio::test]
    async fn claim_is_idempotent() {
        let (_db, directory) = setup().await;

        let first = directory.claim("dev-1", "a1", Some("phone"), false).await.unwrap();
        let second = directory.claim("dev-1", "a1", None, false).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.label, "phone");
    }

    #[tokio::test]
    async fn claim_adopts_first_contact_record() {
        let (db, directory) = setup().await;

        // Device polled before anyone claimed it
        directory.touch("dev-1").await;
        let unowned = db.get_device_by_uid("dev-1").await.unwrap();
        assert!(unowned.owner_id.is_none());

        let claimed = directory.claim("dev-1", "a1", None, false).await.unwrap();
        assert_eq!(claimed.id, unowned.id);
        assert_eq!(claimed.owner_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn foreign_claim_conflicts_without_force() {
        let (_db, directory) = setup().await;

        directory.claim("dev-1", "a1", None, false).await.unwrap();

        let err = directory.claim("dev-1", "a2", None, false).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn forced_takeover_flags_record() {
        let (_db, directory) = setup().await;

        directory.claim("dev-1", "a1", None, false).await.unwrap();
        let taken = directory.claim("dev-1", "a2", None, true).await.unwrap();

        assert_eq!(taken.owner_id.as_deref(), Some("a2"));
        assert_eq!(taken.forced, 1);
    }

    #[tokio::test]
    async fn resolve_owned_enforces_ownership() {
        let (_db, directory) = setup().await;

        directory.claim("dev-1", "a1", None, false).await.unwrap();

        assert!(directory.resolve_owned("dev-1", None).await.is_ok());
        assert!(directory.resolve_owned("dev-1", Some("a1")).await.is_ok());

        let err = directory.resolve_owned("dev-1", Some("a2")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotOwned(_)));

        let err = directory.resolve_owned("dev-9", None).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn unclaimed_device_fails_owner_requirement() {
        let (_db, directory) = setup().await;

        directory.touch("dev-1").await;

        let err = directory.resolve_owned("dev-1", Some("a1")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotOwned(_)));
    }

    #[tokio::test]
    async fn online_is_derived_from_last_seen() {
        let (db, _) = setup().await;
        let directory = DeviceDirectory::with_threshold(db.clone(), 0);

        directory.touch("dev-1").await;
        let device = db.get_device_by_uid("dev-1").await.unwrap();

        // Threshold zero: only "seen this very second" counts
        let strict = DeviceDirectory::with_threshold(db.clone(), -1);
        assert!(!strict.is_online(&device));

        let lenient = DeviceDirectory::with_threshold(db, 3600);
        assert!(lenient.is_online(&device));
    }
}
