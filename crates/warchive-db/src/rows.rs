//! Raw table rows and their conversion into domain types.
//!
//! Columns are read as nullable so a single bad row cannot fail a whole
//! selection; conversion rejects rows missing required fields.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use warchive_models::{LocationId, Photo, PhotoId, Video, VideoRecordId};

use crate::error::DbError;

/// A `photos` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct PhotoRow {
    pub id: i64,
    pub city_id: Option<i64>,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_processed: Option<bool>,
    pub is_failed: Option<bool>,
    pub in_video: Option<bool>,
}

impl TryFrom<PhotoRow> for Photo {
    type Error = DbError;

    fn try_from(row: PhotoRow) -> Result<Self, Self::Error> {
        let city_id = row
            .city_id
            .ok_or_else(|| DbError::invalid_row(Some(row.id), "missing city_id"))?;
        let created_at = row
            .created_at
            .ok_or_else(|| DbError::invalid_row(Some(row.id), "missing created_at"))?;
        let image_url = row
            .image_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| DbError::invalid_row(Some(row.id), "missing image_url"))?;

        Ok(Photo {
            id: PhotoId(row.id),
            location_id: LocationId(city_id),
            image_url,
            created_at,
            is_processed: row.is_processed.unwrap_or(false),
            is_failed: row.is_failed.unwrap_or(false),
            in_video: row.in_video.unwrap_or(false),
        })
    }
}

/// A `videos` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    pub id: i64,
    pub city_id: i64,
    pub time_range_start: DateTime<Utc>,
    pub time_range_end: DateTime<Utc>,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: VideoRecordId(row.id),
            location_id: LocationId(row.city_id),
            time_range_start: row.time_range_start,
            time_range_end: row.time_range_end,
            video_url: row.video_url,
            created_at: row.created_at,
        }
    }
}
