//! A video record: title, description and the URLs of its stored assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persistent description of one uploaded video.
///
/// `video_url` and `thumbnail_url` stay empty until the corresponding upload
/// has completed.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Video {
    /// Record identifier, also used in upload routes.
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Public URL of the thumbnail image, served from the assets directory.
    pub thumbnail_url: Option<String>,

    /// Public URL of the processed video in object storage.
    pub video_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}
