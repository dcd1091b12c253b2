//! Slideshow assembly with bounded encoder concurrency.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use warchive_media::SlideshowEncoder;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::retrieval::StagedGroup;

pub struct AssemblyStage {
    encoder: Arc<dyn SlideshowEncoder>,
    permits: Arc<Semaphore>,
}

impl AssemblyStage {
    pub fn new(encoder: Arc<dyn SlideshowEncoder>, max_concurrent: usize) -> Self {
        Self {
            encoder,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Encode the staged images into `video_{location}.mp4` inside the
    /// group's staging directory.
    pub async fn assemble(&self, staged: &StagedGroup) -> WorkerResult<PathBuf> {
        let output = staged
            .dir()
            .join(format!("video_{}.mp4", staged.location_id));

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| WorkerError::config_error("encoder semaphore closed"))?;

        let started = Instant::now();
        self.encoder.encode(&staged.image_paths(), &output).await?;
        metrics::record_encode_duration(started.elapsed().as_secs_f64());

        Ok(output)
    }
}
