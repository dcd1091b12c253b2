//! Idempotency guard.
//!
//! A group whose staged range overlaps any existing video for its location
//! is treated as already published: its photos are consumed and nothing is
//! encoded.

use std::sync::Arc;

use warchive_db::{PhotoRepository, VideoRepository};
use warchive_models::{LocationId, PhotoId, TimeRange};

use crate::error::WorkerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// No existing video covers the range
    Proceed,
    /// Covered; photos have been marked consumed
    AlreadyCovered,
}

pub struct IdempotencyGuard {
    videos: Arc<dyn VideoRepository>,
    photos: Arc<dyn PhotoRepository>,
}

impl IdempotencyGuard {
    pub fn new(videos: Arc<dyn VideoRepository>, photos: Arc<dyn PhotoRepository>) -> Self {
        Self { videos, photos }
    }

    pub async fn check(
        &self,
        location_id: LocationId,
        range: TimeRange,
        photo_ids: &[PhotoId],
    ) -> WorkerResult<GuardDecision> {
        if !self
            .videos
            .exists_overlapping(location_id, range.start, range.end)
            .await?
        {
            return Ok(GuardDecision::Proceed);
        }

        self.photos.mark_in_video(photo_ids).await?;
        Ok(GuardDecision::AlreadyCovered)
    }
}
