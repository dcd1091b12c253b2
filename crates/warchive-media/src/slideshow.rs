//! Slideshow assembly through the concat demuxer.
//!
//! Every image is shown for a fixed duration. The concat demuxer ignores the
//! `duration` of the final entry, so the last image is listed once more
//! without one; otherwise the last photo would flash for a single frame.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use warchive_models::encoding::MIN_PHOTOS_PER_VIDEO;
use warchive_models::SlideshowSpec;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::filter_letterbox;

/// Anything that can turn an ordered list of images into one video file.
#[async_trait]
pub trait SlideshowEncoder: Send + Sync {
    /// Encode `images` (in display order) into `output`.
    async fn encode(&self, images: &[PathBuf], output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed slideshow encoder.
#[derive(Debug, Clone)]
pub struct FfmpegSlideshow {
    spec: SlideshowSpec,
    runner: FfmpegRunner,
}

impl FfmpegSlideshow {
    pub fn new(spec: SlideshowSpec, runner: FfmpegRunner) -> Self {
        Self { spec, runner }
    }

    /// Build the FFmpeg invocation reading `list_path` and writing `output`.
    pub fn build_command(&self, list_path: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(list_path, output)
            .concat_input()
            .output_args(self.spec.to_ffmpeg_args())
            .video_filter(filter_letterbox(self.spec.width, self.spec.height))
            .faststart()
    }
}

#[async_trait]
impl SlideshowEncoder for FfmpegSlideshow {
    async fn encode(&self, images: &[PathBuf], output: &Path) -> MediaResult<()> {
        if images.len() < MIN_PHOTOS_PER_VIDEO {
            return Err(MediaError::NotEnoughImages {
                got: images.len(),
                needed: MIN_PHOTOS_PER_VIDEO,
            });
        }

        for image in images {
            if !tokio::fs::try_exists(image).await.unwrap_or(false) {
                return Err(MediaError::FileNotFound(image.clone()));
            }
        }

        let list_path = output.with_extension("concat.txt");
        tokio::fs::write(
            &list_path,
            build_concat_list(images, self.spec.seconds_per_photo),
        )
        .await?;

        let cmd = self.build_command(&list_path, output);
        let total_ms = (self.spec.expected_duration_secs(images.len()) * 1000.0) as i64;
        let output_name = output.display().to_string();

        self.runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    output = %output_name,
                    "Encoding {:.0}% (frame {}, {:.1}x)",
                    progress.percentage(total_ms),
                    progress.frame,
                    progress.speed
                );
            })
            .await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(MediaError::InvalidVideo(format!(
                "encoder produced no output at {}",
                output.display()
            )));
        }

        info!(
            "Encoded {} images into {} ({}s)",
            images.len(),
            output.display(),
            self.spec.expected_duration_secs(images.len())
        );
        Ok(())
    }
}

/// Render the concat demuxer list for `images`.
pub fn build_concat_list(images: &[PathBuf], seconds_per_image: u32) -> String {
    let mut lines: Vec<String> = images
        .iter()
        .flat_map(|image| {
            [
                format!("file '{}'", escape_concat_path(image)),
                format!("duration {}", seconds_per_image),
            ]
        })
        .collect();
    if let Some(last) = images.last() {
        lines.push(format!("file '{}'", escape_concat_path(last)));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Quote a path for a single-quoted concat entry.
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
