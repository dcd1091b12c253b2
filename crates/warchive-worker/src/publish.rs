//! Upload, record, then consume.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use warchive_db::{PhotoRepository, VideoRepository};
use warchive_models::video::VIDEO_CONTENT_TYPE;
use warchive_models::{video_object_key, LocationId, NewVideo, PhotoId, TimeRange, VideoRecordId};
use warchive_storage::ObjectStore;

use crate::error::WorkerResult;

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published {
        video_id: VideoRecordId,
        video_url: String,
    },
    /// Another publisher recorded an overlapping video first; photos consumed.
    Covered,
}

pub struct PublishStage {
    store: Arc<dyn ObjectStore>,
    videos: Arc<dyn VideoRepository>,
    photos: Arc<dyn PhotoRepository>,
}

impl PublishStage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoRepository>,
        photos: Arc<dyn PhotoRepository>,
    ) -> Self {
        Self {
            store,
            videos,
            photos,
        }
    }

    /// Photos are marked consumed only after the video row exists. An
    /// uploaded object without a row is left orphaned.
    pub async fn publish(
        &self,
        location_id: LocationId,
        range: TimeRange,
        photo_ids: &[PhotoId],
        artifact: &Path,
    ) -> WorkerResult<PublishOutcome> {
        let key = video_object_key(location_id);
        self.store
            .put_file(artifact, &key, VIDEO_CONTENT_TYPE)
            .await?;
        let video_url = self.store.public_url(&key);

        let record = NewVideo {
            location_id,
            range,
            video_url: video_url.clone(),
        };

        let Some(video_id) = self.videos.insert_if_uncovered(&record).await? else {
            info!(location_id = %location_id, "Range covered concurrently, {} orphaned", key);
            self.photos.mark_in_video(photo_ids).await?;
            return Ok(PublishOutcome::Covered);
        };

        self.photos.mark_in_video(photo_ids).await?;
        Ok(PublishOutcome::Published {
            video_id,
            video_url,
        })
    }
}
