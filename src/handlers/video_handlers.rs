//! HTTP handlers for video records and their uploads.
//!
//! Video bodies are streamed straight into the upload pipeline; thumbnails
//! are small enough to buffer and land under the assets root.

use crate::{errors::AppError, models::video::Video, state::AppState};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use mime::Mime;
use serde::Deserialize;
use std::io;
use tokio::fs;
use uuid::Uuid;

/// Upper bound for a thumbnail image (10 MiB).
pub const MAX_THUMBNAIL_BYTES: usize = 10 << 20;

const VIDEO_FIELD: &str = "video";
const THUMBNAIL_FIELD: &str = "thumbnail";

/// Request body for `POST /api/videos`.
#[derive(Debug, Deserialize)]
pub struct CreateVideoReq {
    pub title: String,
    pub description: Option<String>,
}

/// `POST /api/videos`
pub async fn create_video(
    State(state): State<AppState>,
    Json(payload): Json<CreateVideoReq>,
) -> Result<impl IntoResponse, AppError> {
    let video = state
        .videos
        .create_video(&payload.title, payload.description)
        .await?;
    tracing::info!(video_id = %video.id, "created video record");
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos`
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, AppError> {
    Ok(Json(state.videos.list_videos().await?))
}

/// `GET /api/videos/{video_id}`
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<Video>, AppError> {
    Ok(Json(state.videos.get_video(video_id).await?))
}

/// `POST /api/video_upload/{video_id}`
///
/// Runs the multipart `video` field through the pipeline and points the
/// record at the stored object. The record is looked up first so an
/// unknown id never produces an object.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    state.videos.get_video(video_id).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        tracing::info!(video_id = %video_id, content_type = %content_type, "uploading video");

        let body = field.map(|chunk| chunk.map_err(io::Error::other));
        let uploaded = state.pipeline.run(&content_type, body).await?;

        let video = state.videos.set_video_url(video_id, &uploaded.url).await?;
        tracing::info!(
            video_id = %video_id,
            key = %uploaded.key,
            aspect = %uploaded.aspect,
            size_bytes = uploaded.size_bytes,
            "video upload stored"
        );
        return Ok(Json(video));
    }

    Err(AppError::bad_request(format!(
        "missing multipart field `{VIDEO_FIELD}`"
    )))
}

/// `POST /api/thumbnail_upload/{video_id}`
///
/// Stores a jpeg or png as `<assets_root>/<video_id>.<ext>`, replacing any
/// previous thumbnail of the same video.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    state.videos.get_video(video_id).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = thumbnail_extension(&content_type).ok_or_else(|| {
            AppError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("unsupported thumbnail type `{content_type}`, expected image/jpeg or image/png"),
            )
        })?;

        let data = field.bytes().await?;
        if data.len() > MAX_THUMBNAIL_BYTES {
            return Err(AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("thumbnail exceeds the {MAX_THUMBNAIL_BYTES} byte limit"),
            ));
        }

        let file_name = format!("{video_id}.{extension}");
        let tmp_path = state
            .assets_root
            .join(format!(".tmp-{}", Uuid::new_v4()));
        let final_path = state.assets_root.join(&file_name);

        if let Err(err) = write_then_rename(&tmp_path, &final_path, &data).await {
            let _ = fs::remove_file(&tmp_path).await;
            tracing::error!("Failed to store thumbnail {}: {}", file_name, err);
            return Err(AppError::internal("failed to store thumbnail"));
        }
        remove_stale_thumbnails(&state, video_id, extension).await;

        let url = format!("{}/assets/{}", state.public_url, file_name);
        let video = state.videos.set_thumbnail_url(video_id, &url).await?;
        tracing::info!(video_id = %video_id, size_bytes = data.len(), "thumbnail stored");
        return Ok(Json(video));
    }

    Err(AppError::bad_request(format!(
        "missing multipart field `{THUMBNAIL_FIELD}`"
    )))
}

/// File extension for an accepted thumbnail media type.
fn thumbnail_extension(content_type: &str) -> Option<&'static str> {
    let mime: Mime = content_type.parse().ok()?;
    if mime.type_() != mime::IMAGE {
        return None;
    }
    if mime.subtype() == mime::JPEG {
        Some("jpg")
    } else if mime.subtype() == mime::PNG {
        Some("png")
    } else {
        None
    }
}

async fn write_then_rename(
    tmp_path: &std::path::Path,
    final_path: &std::path::Path,
    data: &[u8],
) -> io::Result<()> {
    fs::write(tmp_path, data).await?;
    fs::rename(tmp_path, final_path).await
}

/// A video switching from png to jpg (or back) must not keep both files.
async fn remove_stale_thumbnails(state: &AppState, video_id: Uuid, current: &str) {
    for extension in ["jpg", "png"] {
        if extension == current {
            continue;
        }
        let stale = state.assets_root.join(format!("{video_id}.{extension}"));
        match fs::remove_file(&stale).await {
            Ok(()) => tracing::debug!("Removed stale thumbnail {:?}", stale),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!("Could not remove stale thumbnail {:?}: {}", stale, err),
        }
    }
}
