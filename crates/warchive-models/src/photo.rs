//! Photo rows.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::window::SelectionWindow;

/// Key prefix for resized images in object storage.
pub const PROCESSED_PREFIX: &str = "processed/";

/// Marker every processed image URL contains.
pub const PROCESSED_URL_MARKER: &str = "/processed/";

/// Identifier of a photo row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct PhotoId(pub i64);

impl PhotoId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PhotoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of the location (city) a webcam belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl LocationId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LocationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A persisted webcam photo.
///
/// Rows are created by the ingest API, flagged `is_processed` by the resize
/// service, and flagged `is_failed` / `in_video` by the video pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Photo {
    /// Row identity
    pub id: PhotoId,
    /// Owning location
    pub location_id: LocationId,
    /// Public URL of the stored image
    pub image_url: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Resize completed
    #[serde(default)]
    pub is_processed: bool,
    /// Retrieval permanently failed
    #[serde(default)]
    pub is_failed: bool,
    /// Already consumed by a video
    #[serde(default)]
    pub in_video: bool,
}

impl Photo {
    /// Whether the stored URL points at a resized artifact.
    pub fn has_processed_location(&self) -> bool {
        self.image_url.contains(PROCESSED_URL_MARKER)
    }

    /// Whether the photo may be picked up by a run over `window`.
    pub fn is_eligible(&self, window: &SelectionWindow) -> bool {
        self.has_processed_location()
            && self.is_processed
            && !self.is_failed
            && !self.in_video
            && window.contains(self.created_at)
    }
}
