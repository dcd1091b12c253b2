//! Video rows.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::photo::LocationId;

/// Key prefix for assembled videos in object storage.
pub const VIDEOS_PREFIX: &str = "videos/";

/// Content type of assembled videos.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Identifier of a video row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoRecordId(pub i64);

impl fmt::Display for VideoRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VideoRecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Inclusive time range `[start, end]` covered by a video's source photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Any overlap between two inclusive ranges.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Extend the range so it covers `ts`.
    pub fn include(range: Option<TimeRange>, ts: DateTime<Utc>) -> TimeRange {
        match range {
            None => TimeRange::new(ts, ts),
            Some(r) => TimeRange::new(r.start.min(ts), r.end.max(ts)),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// A persisted slideshow video. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub id: VideoRecordId,
    pub location_id: LocationId,
    pub time_range_start: DateTime<Utc>,
    pub time_range_end: DateTime<Utc>,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

impl Video {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.time_range_start, self.time_range_end)
    }
}

/// Values for inserting a new video row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideo {
    pub location_id: LocationId,
    pub range: TimeRange,
    pub video_url: String,
}

/// Object key for a new video of `location_id`.
///
/// Format: `videos/video_{location}_{uuid}.mp4`.
pub fn video_object_key(location_id: LocationId) -> String {
    format!(
        "{}video_{}_{}.mp4",
        VIDEOS_PREFIX,
        location_id,
        uuid::Uuid::new_v4()
    )
}
