//! src/services/video_store.rs
//!
//! VideoStore - metadata persistence for video rows, backed by SQLite.
//! Object payloads never pass through here; a row only carries the stored
//! `{bucket},{key}` reference and the thumbnail URL.

use crate::models::video::{CreateVideoParams, Video};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const BOOTSTRAP_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video `{0}` not found")]
    VideoNotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const VIDEO_COLUMNS: &str = "id, created_at, updated_at, title, description, \
                             thumbnail_url, video_url, user_id";

/// Video metadata store. Cloning shares the pool; safe for concurrent use.
///
/// Updates are last-write-wins: two ingests racing on the same video both
/// succeed and the later `update` determines the stored reference.
#[derive(Clone)]
pub struct VideoStore {
    pub db: Arc<SqlitePool>,
}

impl VideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Execute the embedded bootstrap script statement by statement.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = BOOTSTRAP_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            tracing::debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    pub async fn create(&self, params: CreateVideoParams, owner: Uuid) -> StoreResult<Video> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos (id, created_at, updated_at, title, description, user_id)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(&params.title)
        .bind(&params.description)
        .bind(owner)
        .fetch_one(&*self.db)
        .await?;
        Ok(video)
    }

    /// Fetch a video row. Returns VideoNotFound if missing.
    pub async fn get(&self, id: Uuid) -> StoreResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::VideoNotFound(id),
                other => StoreError::Sqlx(other),
            })
    }

    /// Persist the mutable fields of `video`.
    pub async fn update(&self, video: &Video) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET title = ?, description = ?, thumbnail_url = ?, video_url = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.updated_at)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VideoNotFound(video.id));
        }
        Ok(())
    }

    /// Remove the row only; uploaded objects are left in the bucket.
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VideoNotFound(id));
        }
        Ok(())
    }

    /// All videos owned by `user_id`, newest first.
    pub async fn list_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(videos)
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> VideoStore {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = VideoStore::new(Arc::new(pool));
    store.migrate().await.unwrap();
    store
}
