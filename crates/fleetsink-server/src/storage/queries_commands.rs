//! Command queue queries.
//!
//! The queue is a per-device FIFO with a two-phase handoff: the owner
//! enqueues, the device polls (reads only), the device acks. Polling never
//! marks a command delivered, so a device that crashes between poll and
//! ack sees the command again on its next poll (at-least-once).

use fleetsink_core::db::unix_timestamp;

use super::db::FleetDatabase;
use super::models::{Command, command_status};
use fleetsink_core::db::DatabaseError;

impl FleetDatabase {
    /// Append a pending command for a device. Duplicates are allowed.
    pub async fn create_command(
        &self,
        id: &str,
        device_uid: &str,
        issuer_id: &str,
        command: &str,
        params_json: &str,
    ) -> Result<Command, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO commands (id, device_uid, issuer_id, command, params, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(device_uid)
        .bind(issuer_id)
        .bind(command)
        .bind(params_json)
        .bind(command_status::PENDING)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_command(id).await
    }

    /// Get a command by ID.
    pub async fn get_command(&self, id: &str) -> Result<Command, DatabaseError> {
        sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Command {id}")))
    }

    /// Pending commands for a device, oldest first. Read-only: delivery
    /// does not change status.
    pub async fn list_pending_commands(
        &self,
        device_uid: &str,
        limit: u32,
    ) -> Result<Vec<Command>, DatabaseError> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE device_uid = ? AND status = ? \
             ORDER BY created_at ASC, rowid ASC LIMIT ?",
        )
        .bind(device_uid)
        .bind(command_status::PENDING)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Transition a pending command to done, keyed by both id and device
    /// identifier. Returns `false` when nothing matched (unknown id, wrong
    /// device, or already acked) -- callers treat that as a no-op.
    pub async fn ack_command(
        &self,
        device_uid: &str,
        command_id: &str,
        result: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let outcome = sqlx::query(
            "UPDATE commands SET status = ?, result = ?, completed_at = ? \
             WHERE id = ? AND device_uid = ? AND status = ?",
        )
        .bind(command_status::DONE)
        .bind(result)
        .bind(now)
        .bind(command_id)
        .bind(device_uid)
        .bind(command_status::PENDING)
        .execute(self.pool())
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Recent commands for a device regardless of status, newest first
    /// (dashboard history).
    pub async fn list_recent_commands(
        &self,
        device_uid: &str,
        limit: u32,
    ) -> Result<Vec<Command>, DatabaseError> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE device_uid = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(device_uid)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Count pending commands for a device.
    pub async fn count_pending_commands(&self, device_uid: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM commands WHERE device_uid = ? AND status = ?")
                .bind(device_uid)
                .bind(command_status::PENDING)
                .fetch_one(self.pool())
                .await?;

        Ok(row.0)
    }

    /// Count commands that have been pending since before `cutoff`.
    ///
    /// The queue never expires commands; stale ones are a correctness
    /// signal surfaced by the background sweep.
    pub async fn count_stale_pending_commands(&self, cutoff: i64) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM commands WHERE status = ? AND created_at < ?",
        )
        .bind(command_status::PENDING)
        .bind(cutoff)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }
}
