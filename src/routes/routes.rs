//! Defines the HTTP routes.
//!
//! - `GET  /healthz`, `GET /readyz`
//! - `POST /api/videos`, `GET /api/videos`, `GET /api/videos/{video_id}`
//! - `POST /api/video_upload/{video_id}` (multipart field `video`)
//! - `POST /api/thumbnail_upload/{video_id}` (multipart field `thumbnail`)
//! - `GET  /assets/{file}`

use crate::{
    handlers::{
        asset_handlers::get_asset,
        health_handlers::{healthz, readyz},
        video_handlers::{
            MAX_THUMBNAIL_BYTES, create_video, get_video, list_videos, upload_thumbnail,
            upload_video,
        },
    },
    pipeline::MAX_VIDEO_UPLOAD_BYTES,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router; upload routes get their own body limits.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", post(create_video).get(list_videos))
        .route("/api/videos/{video_id}", get(get_video))
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::max(
                MAX_VIDEO_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES,
            )),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail)
                .layer(DefaultBodyLimit::max(MAX_THUMBNAIL_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/assets/{file}", get(get_asset))
}
