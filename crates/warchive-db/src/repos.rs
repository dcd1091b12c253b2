//! Photo and video repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use warchive_models::{LocationId, NewVideo, Photo, PhotoId, Video, VideoRecordId};

use crate::error::DbResult;
use crate::rows::{PhotoRow, VideoRow};

/// Access to the `photos` table.
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// Eligible photos created in `[start, end)`, ordered by location then
    /// newest first.
    async fn select_eligible(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Photo>>;

    /// Flag photos whose content could not be retrieved. Returns rows changed.
    async fn mark_failed(&self, ids: &[PhotoId]) -> DbResult<u64>;

    /// Flag photos as consumed by a video. Returns rows changed.
    async fn mark_in_video(&self, ids: &[PhotoId]) -> DbResult<u64>;
}

/// Access to the `videos` table.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Whether any video for `location_id` overlaps `[start, end]`.
    async fn exists_overlapping(
        &self,
        location_id: LocationId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Insert a video record.
    async fn insert(&self, video: &NewVideo) -> DbResult<VideoRecordId>;

    /// Insert unless an overlapping video already exists.
    ///
    /// Returns `None` when the range is already covered. Implementations
    /// backed by a shared store should make the check and insert atomic.
    async fn insert_if_uncovered(&self, video: &NewVideo) -> DbResult<Option<VideoRecordId>> {
        if self
            .exists_overlapping(video.location_id, video.range.start, video.range.end)
            .await?
        {
            return Ok(None);
        }
        self.insert(video).await.map(Some)
    }
}

const SELECT_ELIGIBLE: &str = r#"
    SELECT id::BIGINT AS id, city_id::BIGINT AS city_id, image_url, created_at,
           is_processed, is_failed, in_video
    FROM photos
    WHERE image_url LIKE '%/processed/%'
      AND is_processed = true
      AND is_failed = false
      AND in_video = false
      AND created_at >= $1
      AND created_at < $2
    ORDER BY city_id, created_at DESC, id DESC
"#;

/// Postgres-backed photo repository.
#[derive(Clone)]
pub struct PgPhotoRepository {
    pool: PgPool,
}

impl PgPhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepository for PgPhotoRepository {
    async fn select_eligible(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Photo>> {
        let rows: Vec<PhotoRow> = sqlx::query_as(SELECT_ELIGIBLE)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        let total = rows.len();
        let photos: Vec<Photo> = rows
            .into_iter()
            .filter_map(|row| match Photo::try_from(row) {
                Ok(photo) => Some(photo),
                Err(e) => {
                    warn!("Skipping unreadable photo row: {}", e);
                    None
                }
            })
            .collect();

        debug!(
            "Selected {} eligible photos ({} rows) in [{}, {})",
            photos.len(),
            total,
            start,
            end
        );
        Ok(photos)
    }

    async fn mark_failed(&self, ids: &[PhotoId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i64> = ids.iter().map(PhotoId::as_i64).collect();
        let result = sqlx::query(
            "UPDATE photos SET is_failed = true WHERE id = ANY($1) AND in_video = false",
        )
        .bind(&ids)
        .execute(&self.pool)
        .await?;

        info!("Marked {} photos failed", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn mark_in_video(&self, ids: &[PhotoId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i64> = ids.iter().map(PhotoId::as_i64).collect();
        let result = sqlx::query(
            "UPDATE photos SET in_video = true WHERE id = ANY($1) AND in_video = false",
        )
        .bind(&ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

const EXISTS_OVERLAPPING: &str = r#"
    SELECT id::BIGINT FROM videos
    WHERE city_id = $1 AND time_range_start <= $3 AND time_range_end >= $2
    LIMIT 1
"#;

const INSERT_VIDEO: &str = r#"
    INSERT INTO videos (city_id, time_range_start, time_range_end, video_url)
    VALUES ($1, $2, $3, $4)
    RETURNING id::BIGINT
"#;

/// Postgres-backed video repository.
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Videos recorded for a location, newest range first.
    pub async fn list_for_location(&self, location_id: LocationId) -> DbResult<Vec<Video>> {
        let rows: Vec<VideoRow> = sqlx::query_as(
            r#"
            SELECT id::BIGINT AS id, city_id::BIGINT AS city_id, time_range_start,
                   time_range_end, video_url, created_at
            FROM videos WHERE city_id = $1
            ORDER BY time_range_start DESC
            "#,
        )
        .bind(location_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Video::from).collect())
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn exists_overlapping(
        &self,
        location_id: LocationId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<bool> {
        let hit: Option<i64> = sqlx::query_scalar(EXISTS_OVERLAPPING)
            .bind(location_id.as_i64())
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hit.is_some())
    }

    async fn insert(&self, video: &NewVideo) -> DbResult<VideoRecordId> {
        let id: i64 = sqlx::query_scalar(INSERT_VIDEO)
            .bind(video.location_id.as_i64())
            .bind(video.range.start)
            .bind(video.range.end)
            .bind(&video.video_url)
            .fetch_one(&self.pool)
            .await?;

        info!("Recorded video {} for location {}", id, video.location_id);
        Ok(VideoRecordId(id))
    }

    async fn insert_if_uncovered(&self, video: &NewVideo) -> DbResult<Option<VideoRecordId>> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent publishers for the same location until commit
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(video.location_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let hit: Option<i64> = sqlx::query_scalar(EXISTS_OVERLAPPING)
            .bind(video.location_id.as_i64())
            .bind(video.range.start)
            .bind(video.range.end)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(existing) = hit {
            tx.rollback().await?;
            info!(
                "Video {} already covers {} for location {}",
                existing, video.range, video.location_id
            );
            return Ok(None);
        }

        let id: i64 = sqlx::query_scalar(INSERT_VIDEO)
            .bind(video.location_id.as_i64())
            .bind(video.range.start)
            .bind(video.range.end)
            .bind(&video.video_url)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Recorded video {} for location {}", id, video.location_id);
        Ok(Some(VideoRecordId(id)))
    }
}
