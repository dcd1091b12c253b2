//! Staging photo content into a per-group temporary directory.
//!
//! Each photo is resolved, fetched and written independently. A bad URL
//! skips the photo; a fetch or write failure marks it failed. Neither stops
//! the rest of the group.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};
use warchive_db::PhotoRepository;
use warchive_models::encoding::MIN_PHOTOS_PER_VIDEO;
use warchive_models::{LocationId, Photo, PhotoId, TimeRange};
use warchive_storage::{processed_key_from_url, ObjectStore};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::GroupLogger;
use crate::selection::Group;

/// A photo whose content sits on local disk.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub photo_id: PhotoId,
    pub path: PathBuf,
}

/// Result of staging one group. Dropping it removes the staging directory.
#[derive(Debug)]
pub struct StagedGroup {
    pub location_id: LocationId,
    /// Staged images in group order
    pub images: Vec<StagedImage>,
    /// Photos whose content could not be retrieved
    pub failed: Vec<PhotoId>,
    /// Photos whose URL is not a processed-image location
    pub skipped: Vec<PhotoId>,
    /// Earliest and latest timestamps over staged images
    pub range: Option<TimeRange>,
    dir: TempDir,
}

impl StagedGroup {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn photo_ids(&self) -> Vec<PhotoId> {
        self.images.iter().map(|i| i.photo_id).collect()
    }

    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.images.iter().map(|i| i.path.clone()).collect()
    }

    /// Enough images staged to build a slideshow.
    pub fn is_viable(&self) -> bool {
        self.images.len() >= MIN_PHOTOS_PER_VIDEO
    }
}

enum ItemError {
    Malformed(String),
    Unavailable(String),
}

/// Fetches a group's photos through the storage gateway.
pub struct Retriever {
    store: Arc<dyn ObjectStore>,
    photos: Arc<dyn PhotoRepository>,
    fetch_timeout: Duration,
    work_dir: Option<PathBuf>,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        photos: Arc<dyn PhotoRepository>,
        fetch_timeout: Duration,
        work_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            photos,
            fetch_timeout,
            work_dir,
        }
    }

    /// Stage every photo of `group`, then mark the unavailable ones failed.
    ///
    /// Errors only for the staging directory or the failure-marking update.
    pub async fn stage(&self, group: &Group, log: &GroupLogger) -> WorkerResult<StagedGroup> {
        let dir = self.create_dir(group.location_id)?;
        let mut staged = StagedGroup {
            location_id: group.location_id,
            images: Vec::with_capacity(group.len()),
            failed: Vec::new(),
            skipped: Vec::new(),
            range: None,
            dir,
        };

        for photo in &group.photos {
            let target = staged.dir.path().join(format!("img_{}.jpg", photo.id));
            match self.stage_one(photo, &target).await {
                Ok(()) => {
                    staged.range = Some(TimeRange::include(staged.range, photo.created_at));
                    staged.images.push(StagedImage {
                        photo_id: photo.id,
                        path: target,
                    });
                }
                Err(ItemError::Malformed(reason)) => {
                    log.log_warning(&format!("photo {} skipped: {}", photo.id, reason));
                    staged.skipped.push(photo.id);
                }
                Err(ItemError::Unavailable(reason)) => {
                    log.log_warning(&format!("photo {} failed: {}", photo.id, reason));
                    staged.failed.push(photo.id);
                }
            }
        }

        if !staged.failed.is_empty() {
            self.photos.mark_failed(&staged.failed).await?;
        }

        log.log_progress(&format!(
            "staged {}/{} photos ({} failed, {} skipped)",
            staged.images.len(),
            group.len(),
            staged.failed.len(),
            staged.skipped.len()
        ));
        Ok(staged)
    }

    async fn stage_one(&self, photo: &Photo, target: &Path) -> Result<(), ItemError> {
        let key = processed_key_from_url(&photo.image_url, self.store.bucket())
            .map_err(|e| ItemError::Malformed(e.to_string()))?;

        let bytes = match tokio::time::timeout(self.fetch_timeout, self.store.get(&key)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(ItemError::Unavailable(e.to_string())),
            Err(_) => {
                return Err(ItemError::Unavailable(format!(
                    "fetch of {} timed out after {:?}",
                    key, self.fetch_timeout
                )))
            }
        };

        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| ItemError::Unavailable(format!("write {}: {}", target.display(), e)))?;

        debug!(photo_id = %photo.id, "Staged {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn create_dir(&self, location_id: LocationId) -> WorkerResult<TempDir> {
        let prefix = format!("warchive_{}_", location_id);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match &self.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        };

        dir.map_err(|e| {
            warn!(location_id = %location_id, "Cannot create staging dir: {}", e);
            WorkerError::staging_failed(format!("staging dir: {}", e))
        })
    }
}
