//! Media object metadata queries.
//!
//! The `UNIQUE (device_uid, digest)` constraint is the dedup authority:
//! the blob store treats a `Conflict` on insert as "someone else committed
//! the same bytes first" and re-selects the winner.

use fleetsink_core::db::unix_timestamp;

use super::db::FleetDatabase;
use super::models::MediaObject;
use fleetsink_core::db::DatabaseError;

/// Column values for a new media object row.
pub struct MediaObjectParams<'a> {
    pub id: &'a str,
    pub account_id: &'a str,
    pub device_uid: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub length: i64,
    pub digest: &'a str,
    pub metadata_json: &'a str,
}

impl FleetDatabase {
    /// Insert a media object row. Fails with [`DatabaseError::Conflict`]
    /// when `(device_uid, digest)` already exists.
    pub async fn create_media_object(
        &self,
        params: &MediaObjectParams<'_>,
    ) -> Result<MediaObject, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO media_objects \
             (id, account_id, device_uid, filename, content_type, length, digest, metadata, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.account_id)
        .bind(params.device_uid)
        .bind(params.filename)
        .bind(params.content_type)
        .bind(params.length)
        .bind(params.digest)
        .bind(params.metadata_json)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_media_object(params.id).await
    }

    /// Get a media object by ID.
    pub async fn get_media_object(&self, id: &str) -> Result<MediaObject, DatabaseError> {
        sqlx::query_as::<_, MediaObject>("SELECT * FROM media_objects WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Media object {id}")))
    }

    /// Look up the media object for a `(device, digest)` pair, if any.
    pub async fn find_media_by_digest(
        &self,
        device_uid: &str,
        digest: &str,
    ) -> Result<Option<MediaObject>, DatabaseError> {
        let object = sqlx::query_as::<_, MediaObject>(
            "SELECT * FROM media_objects WHERE device_uid = ? AND digest = ?",
        )
        .bind(device_uid)
        .bind(digest)
        .fetch_optional(self.pool())
        .await?;

        Ok(object)
    }

    /// Page through an account's media metadata, optionally narrowed to one
    /// device, newest first.
    pub async fn list_media_objects(
        &self,
        account_id: &str,
        device_uid: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MediaObject>, DatabaseError> {
        let objects = if let Some(device_uid) = device_uid {
            sqlx::query_as::<_, MediaObject>(
                "SELECT * FROM media_objects WHERE account_id = ? AND device_uid = ? \
                 ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            )
            .bind(account_id)
            .bind(device_uid)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, MediaObject>(
                "SELECT * FROM media_objects WHERE account_id = ? \
                 ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            )
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?
        };

        Ok(objects)
    }

    /// Count an account's media objects, optionally narrowed to one device.
    pub async fn count_media_objects(
        &self,
        account_id: &str,
        device_uid: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = if let Some(device_uid) = device_uid {
            sqlx::query_as(
                "SELECT COUNT(*) FROM media_objects WHERE account_id = ? AND device_uid = ?",
            )
            .bind(account_id)
            .bind(device_uid)
            .fetch_one(self.pool())
            .await?
        } else {
            sqlx::query_as("SELECT COUNT(*) FROM media_objects WHERE account_id = ?")
                .bind(account_id)
                .fetch_one(self.pool())
                .await?
        };

        Ok(row.0)
    }
}
