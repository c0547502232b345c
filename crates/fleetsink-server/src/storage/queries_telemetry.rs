//! Plain telemetry queries: location fixes and notification events.

use fleetsink_core::db::unix_timestamp;

use super::db::FleetDatabase;
use super::models::{DeviceNotification, LocationFix};
use fleetsink_core::db::DatabaseError;

impl FleetDatabase {
    /// Store a location fix.
    pub async fn create_location(
        &self,
        id: &str,
        device_uid: &str,
        account_id: &str,
        lat: f64,
        lon: f64,
        accuracy: f64,
        recorded_at: i64,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO locations (id, device_uid, account_id, lat, lon, accuracy, recorded_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(device_uid)
        .bind(account_id)
        .bind(lat)
        .bind(lon)
        .bind(accuracy)
        .bind(recorded_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Recent location fixes for a device, newest first.
    pub async fn list_locations(
        &self,
        account_id: &str,
        device_uid: &str,
        limit: u32,
    ) -> Result<Vec<LocationFix>, DatabaseError> {
        let fixes = sqlx::query_as::<_, LocationFix>(
            "SELECT * FROM locations WHERE account_id = ? AND device_uid = ? \
             ORDER BY recorded_at DESC, rowid DESC LIMIT ?",
        )
        .bind(account_id)
        .bind(device_uid)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(fixes)
    }

    /// Store a notification event.
    pub async fn create_notification(
        &self,
        id: &str,
        device_uid: &str,
        account_id: &str,
        source: &str,
        message: &str,
        recorded_at: i64,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO notifications (id, device_uid, account_id, source, message, recorded_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(device_uid)
        .bind(account_id)
        .bind(source)
        .bind(message)
        .bind(recorded_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Recent notification events for a device, newest first.
    pub async fn list_notifications(
        &self,
        account_id: &str,
        device_uid: &str,
        limit: u32,
    ) -> Result<Vec<DeviceNotification>, DatabaseError> {
        let events = sqlx::query_as::<_, DeviceNotification>(
            "SELECT * FROM notifications WHERE account_id = ? AND device_uid = ? \
             ORDER BY recorded_at DESC, rowid DESC LIMIT ?",
        )
        .bind(account_id)
        .bind(device_uid)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }
}
