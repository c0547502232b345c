//! Media upload, listing, and streamed retrieval.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::Response;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::Claims;
use crate::storage::MediaObject;
use fleetsink_core::{Event, Metadata};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub duplicate: bool,
}

#[derive(Debug, Deserialize)]
pub struct MediaListQuery {
    pub device_uid: Option<String>,
    #[serde(default)]
    pub page: u32,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MediaItem {
    pub id: String,
    pub device_uid: String,
    pub filename: String,
    pub content_type: String,
    pub length: i64,
    pub uploaded_at: i64,
}

impl From<MediaObject> for MediaItem {
    fn from(o: MediaObject) -> Self {
        Self {
            id: o.id,
            device_uid: o.device_uid,
            filename: o.filename,
            content_type: o.content_type,
            length: o.length,
            uploaded_at: o.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub items: Vec<MediaItem>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Device-facing multipart upload.
///
/// Text fields (`device_uid`, optionally `metadata`) must precede the
/// `file` part so ownership is settled before any payload byte is read;
/// the file part is then handed to the blob store as a stream and never
/// buffered whole.
#[instrument(skip_all, fields(route = "media/upload"))]
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut device_uid: Option<String> = None;
    let mut metadata = Metadata::default();
    let mut outcome = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("device_uid") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("bad device_uid field: {e}")))?;
                device_uid = Some(value);
            }
            Some("metadata") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("bad metadata field: {e}")))?;
                metadata = Metadata::parse(&raw)?;
            }
            Some("file") => {
                let uid = device_uid
                    .as_deref()
                    .ok_or_else(|| {
                        ApiError::InvalidInput("device_uid must precede file field".into())
                    })?
                    .to_string();

                state.directory.touch(&uid).await;
                let device = state.directory.resolve_owned(&uid, None).await?;
                let Some(owner_id) = device.owner_id else {
                    return Err(ApiError::Forbidden(format!(
                        "device {uid} is unclaimed, uploads are not accepted"
                    )));
                };

                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let result = state
                    .blobs
                    .ingest(
                        &owner_id,
                        &uid,
                        &filename,
                        &content_type,
                        &metadata,
                        Box::pin(field),
                    )
                    .await?;

                // Notify only after the row is durably committed, so a
                // pushed client can fetch the object immediately.
                if !result.duplicate {
                    let object = &result.object;
                    state
                        .broker
                        .publish(
                            &owner_id,
                            &Event::Media {
                                id: object.id.clone(),
                                device_uid: object.device_uid.clone(),
                                filename: object.filename.clone(),
                                content_type: object.content_type.clone(),
                                length: object.length,
                            },
                        )
                        .await;
                }

                outcome = Some(result);
            }
            _ => {}
        }
    }

    let result = outcome.ok_or_else(|| ApiError::InvalidInput("file field required".into()))?;
    Ok(Json(UploadResponse {
        id: result.object.id,
        duplicate: result.duplicate,
    }))
}

#[instrument(skip_all, fields(route = "media/list"))]
pub async fn list_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MediaListQuery>,
) -> Result<Json<MediaListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.page.saturating_mul(limit);

    let items = state
        .blobs
        .list(&claims.sub, query.device_uid.as_deref(), limit, offset)
        .await?;
    let total = state
        .db
        .count_media_objects(&claims.sub, query.device_uid.as_deref())
        .await?;

    Ok(Json(MediaListResponse {
        items: items.into_iter().map(MediaItem::from).collect(),
        total,
        page: query.page,
        limit,
    }))
}

/// Stream an object inline. Ownership is settled before the first byte of
/// the body is produced.
#[instrument(skip_all, fields(route = "media/fetch"))]
pub async fn fetch_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (object, file) = state.blobs.retrieve(&id, &claims.sub).await?;
    stream_object(&object, file, false)
}

/// Stream an object as an attachment download.
#[instrument(skip_all, fields(route = "media/download"))]
pub async fn download_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (object, file) = state.blobs.retrieve(&id, &claims.sub).await?;
    stream_object(&object, file, true)
}

fn stream_object(
    object: &MediaObject,
    file: tokio::fs::File,
    attachment: bool,
) -> Result<Response, ApiError> {
    let body = Body::from_stream(ReaderStream::new(file));

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, object.content_type.as_str())
        .header(header::CONTENT_LENGTH, object.length);

    if attachment {
        let safe_name = object.filename.replace('"', "");
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe_name}\""),
        );
    }

    builder
        .body(body)
        .map_err(|e| ApiError::Storage(e.to_string()))
}
