//! Account, token, and device queries for the fleetsink server.

use fleetsink_core::db::unix_timestamp;

use super::db::FleetDatabase;
use super::models::{Account, AuthToken, Device};
use fleetsink_core::db::DatabaseError;

impl FleetDatabase {
    // =========================================================================
    // Account queries
    // =========================================================================

    /// Create a new account.
    pub async fn create_account(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO accounts (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_account(id).await
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {id}")))
    }

    /// Get an account by username.
    pub async fn get_account_by_username(&self, username: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account with username {username}")))
    }

    // =========================================================================
    // Token queries
    // =========================================================================

    /// Store a refresh token (hashed, never raw).
    pub async fn create_auth_token(
        &self,
        id: &str,
        account_id: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tokens (id, account_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(account_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Find a valid (non-revoked, non-expired) token by hash.
    pub async fn get_auth_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthToken>, DatabaseError> {
        let now = unix_timestamp();

        let token = sqlx::query_as::<_, AuthToken>(
            "SELECT * FROM tokens WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    /// Revoke a token by ID.
    pub async fn revoke_auth_token(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Device queries
    // =========================================================================

    /// Record that a device was heard from, creating an unowned record on
    /// first contact.
    pub async fn touch_device(&self, id: &str, device_uid: &str) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO devices (id, device_uid, created_at, last_seen) VALUES (?, ?, ?, ?) \
             ON CONFLICT(device_uid) DO UPDATE SET last_seen = excluded.last_seen",
        )
        .bind(id)
        .bind(device_uid)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get a device by its hardware identifier.
    pub async fn get_device_by_uid(&self, device_uid: &str) -> Result<Device, DatabaseError> {
        self.find_device_by_uid(device_uid)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {device_uid}")))
    }

    /// Look up a device by its hardware identifier, `None` if unknown.
    pub async fn find_device_by_uid(
        &self,
        device_uid: &str,
    ) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE device_uid = ?")
            .bind(device_uid)
            .fetch_optional(self.pool())
            .await?;

        Ok(device)
    }

    /// Create a device record already owned by `owner_id`. Returns `false`
    /// if a record for the identifier already existed.
    pub async fn create_claimed_device(
        &self,
        id: &str,
        device_uid: &str,
        label: &str,
        owner_id: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO devices (id, device_uid, label, owner_id, created_at, last_seen) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(device_uid) DO NOTHING",
        )
        .bind(id)
        .bind(device_uid)
        .bind(label)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Take ownership of an unowned device. The `owner_id IS NULL` guard
    /// makes the claim atomic; `false` means someone else got there first.
    pub async fn claim_unowned_device(
        &self,
        device_uid: &str,
        owner_id: &str,
        label: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE devices SET owner_id = ?, label = ?, last_seen = ? \
             WHERE device_uid = ? AND owner_id IS NULL",
        )
        .bind(owner_id)
        .bind(label)
        .bind(now)
        .bind(device_uid)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Refresh label/last-seen on a device already owned by `owner_id`
    /// (idempotent re-claim).
    pub async fn refresh_device_claim(
        &self,
        device_uid: &str,
        owner_id: &str,
        label: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE devices SET label = ?, last_seen = ? WHERE device_uid = ? AND owner_id = ?",
        )
        .bind(label)
        .bind(now)
        .bind(device_uid)
        .bind(owner_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Forcibly reassign a device from `prev_owner_id` to `owner_id`,
    /// setting the `forced` audit bit. The previous-owner guard makes the
    /// takeover atomic; `false` means ownership changed underneath us.
    pub async fn reassign_device_owner(
        &self,
        device_uid: &str,
        owner_id: &str,
        prev_owner_id: &str,
        label: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE devices SET owner_id = ?, label = ?, forced = 1, last_seen = ? \
             WHERE device_uid = ? AND owner_id = ?",
        )
        .bind(owner_id)
        .bind(label)
        .bind(now)
        .bind(device_uid)
        .bind(prev_owner_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List devices owned by an account, most recently seen first.
    pub async fn list_devices(&self, owner_id: &str) -> Result<Vec<Device>, DatabaseError> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE owner_id = ? ORDER BY last_seen DESC",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(devices)
    }
}
