//! Content-addressed blob storage.
//!
//! Uploads are streamed once: every chunk goes to a temp file and into a
//! SHA-256 accumulator at the same time, so the object is never buffered
//! whole in memory and the digest is final exactly when the stream ends.
//! Bytes live under `<root>/blobs/<digest[0..2]>/<digest>`; the database
//! row is the commit point, and its `UNIQUE (device_uid, digest)`
//! constraint arbitrates concurrent identical uploads.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::storage::{FleetDatabase, MediaObject, MediaObjectParams};
use fleetsink_core::Metadata;
use fleetsink_core::db::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("unknown media object {0}")]
    NotFound(String),

    #[error("media object {0} belongs to another account")]
    Forbidden(String),

    #[error("upload stream failed: {0}")]
    Stream(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DatabaseError> for BlobError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result of one upload: the object the caller should reference, and
/// whether it predated this upload.
#[derive(Debug)]
pub struct IngestOutcome {
    pub object: MediaObject,
    pub duplicate: bool,
}

pub struct BlobStore {
    db: FleetDatabase,
    root: PathBuf,
}

impl BlobStore {
    /// Open a blob store rooted at `root`, creating the directory tree.
    pub fn open(db: FleetDatabase, root: &Path) -> Result<Self, BlobError> {
        std::fs::create_dir_all(root.join("blobs"))
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        Ok(Self {
            db,
            root: root.to_path_buf(),
        })
    }

    /// Ingest one upload for an already-resolved, owned device.
    ///
    /// The caller (ingestion gateway) has verified ownership; this method
    /// owns the byte pipeline and the dedup decision. A stream error or
    /// client disconnect aborts before the row is written: the temp file
    /// is dropped and no partial object exists.
    pub async fn ingest<S, E>(
        &self,
        account_id: &str,
        device_uid: &str,
        filename: &str,
        content_type: &str,
        metadata: &Metadata,
        mut stream: S,
    ) -> Result<IngestOutcome, BlobError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let staged = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        let mut file = tokio::fs::File::create(staged.path())
            .await
            .map_err(|e| BlobError::Storage(e.to_string()))?;

        let mut hasher = Sha256::new();
        let mut length: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BlobError::Stream(e.to_string()))?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| BlobError::Storage(e.to_string()))?;
            length += chunk.len() as u64;
        }
        file.sync_all()
            .await
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        drop(file);

        let digest = format!("{:x}", hasher.finalize());
        let length = i64::try_from(length).unwrap_or(i64::MAX);

        // Fast path: this device already uploaded these bytes.
        if let Some(existing) = self.db.find_media_by_digest(device_uid, &digest).await? {
            debug!(device_uid, digest = %digest, "Duplicate upload, reusing object");
            return Ok(IngestOutcome {
                object: existing,
                duplicate: true,
            });
        }

        let path = self.blob_path(&digest);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BlobError::Storage(e.to_string()))?;
        }
        // Content-addressed target: a concurrent writer of the same digest
        // lands identical bytes, so overwriting is harmless.
        staged
            .persist(&path)
            .map_err(|e| BlobError::Storage(e.to_string()))?;

        let id = uuid::Uuid::new_v4().to_string();
        let params = MediaObjectParams {
            id: &id,
            account_id,
            device_uid,
            filename,
            content_type,
            length,
            digest: &digest,
            metadata_json: &metadata.to_json(),
        };

        match self.db.create_media_object(&params).await {
            Ok(object) => {
                info!(
                    id = %object.id,
                    device_uid,
                    length,
                    digest = %digest,
                    "Media object stored"
                );
                Ok(IngestOutcome {
                    object,
                    duplicate: false,
                })
            }
            Err(DatabaseError::Conflict(_)) => {
                // A concurrent identical upload committed first; its row wins.
                let winner = self
                    .db
                    .find_media_by_digest(device_uid, &digest)
                    .await?
                    .ok_or_else(|| {
                        BlobError::Storage(format!(
                            "dedup winner vanished for device {device_uid} digest {digest}"
                        ))
                    })?;
                debug!(device_uid, digest = %digest, "Lost dedup race, returning winner");
                Ok(IngestOutcome {
                    object: winner,
                    duplicate: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve an object for the requesting account and open its bytes.
    ///
    /// Ownership is checked here, before the caller has sent a single
    /// response byte.
    pub async fn retrieve(
        &self,
        id: &str,
        account_id: &str,
    ) -> Result<(MediaObject, tokio::fs::File), BlobError> {
        let object = self.db.get_media_object(id).await?;
        if object.account_id != account_id {
            return Err(BlobError::Forbidden(id.to_string()));
        }

        let file = tokio::fs::File::open(self.blob_path(&object.digest))
            .await
            .map_err(|e| BlobError::Storage(e.to_string()))?;
        Ok((object, file))
    }

    /// Metadata page for an account, optionally narrowed to one device.
    pub async fn list(
        &self,
        account_id: &str,
        device_uid: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MediaObject>, BlobError> {
        Ok(self
            .db
            .list_media_objects(account_id, device_uid, limit, offset)
            .await?)
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.root.join("blobs").join(&digest[..2]).join(digest)
    }
}
