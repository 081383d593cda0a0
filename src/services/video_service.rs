//! Video records backed by SQLite.
//!
//! The upload pipeline never touches this store; HTTP handlers update a
//! record with the URL a successful run produced.

use crate::models::video::Video;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const VIDEO_COLUMNS: &str =
    "id, title, description, thumbnail_url, video_url, created_at, updated_at";

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("video `{0}` not found")]
    VideoNotFound(Uuid),
    #[error("video title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Clone)]
pub struct VideoService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl VideoService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new record with no uploaded assets yet.
    pub async fn create_video(
        &self,
        title: &str,
        description: Option<String>,
    ) -> RecordResult<Video> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RecordError::EmptyTitle);
        }

        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos (id, title, description, thumbnail_url, video_url, created_at, updated_at)
             VALUES (?, ?, ?, NULL, NULL, ?, ?)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        Ok(video)
    }

    pub async fn get_video(&self, id: Uuid) -> RecordResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => RecordError::VideoNotFound(id),
                other => RecordError::Sqlx(other),
            })
    }

    /// All records, newest first.
    pub async fn list_videos(&self) -> RecordResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(videos)
    }

    pub async fn set_video_url(&self, id: Uuid, url: &str) -> RecordResult<Video> {
        self.set_url_column("video_url", id, url).await
    }

    pub async fn set_thumbnail_url(&self, id: Uuid, url: &str) -> RecordResult<Video> {
        self.set_url_column("thumbnail_url", id, url).await
    }

    async fn set_url_column(&self, column: &'static str, id: Uuid, url: &str) -> RecordResult<Video> {
        sqlx::query_as::<_, Video>(&format!(
            "UPDATE videos SET {column} = ?, updated_at = ? WHERE id = ? RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RecordError::VideoNotFound(id),
            other => RecordError::Sqlx(other),
        })
    }
}

/// Run the embedded schema statements one by one.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
