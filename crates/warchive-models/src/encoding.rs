//! Slideshow encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Pixel format with the widest player support
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Output frame rate
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Display time of each photo; five photos make a 15 second video
pub const DEFAULT_SECONDS_PER_PHOTO: u32 = 3;

/// Output canvas
pub const CANVAS_WIDTH: u32 = 1280;
pub const CANVAS_HEIGHT: u32 = 720;

/// Most recent photos per location that go into one video
pub const MAX_PHOTOS_PER_VIDEO: usize = 5;
/// Fewer staged photos than this abandons the group
pub const MIN_PHOTOS_PER_VIDEO: usize = 2;

/// Slideshow encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SlideshowSpec {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Seconds each image stays on screen
    #[serde(default = "default_seconds_per_photo")]
    pub seconds_per_photo: u32,

    /// Output frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Output pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Canvas width; images are scaled to fit and letterboxed
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canvas height
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_seconds_per_photo() -> u32 {
    DEFAULT_SECONDS_PER_PHOTO
}
fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_width() -> u32 {
    CANVAS_WIDTH
}
fn default_height() -> u32 {
    CANVAS_HEIGHT
}

impl Default for SlideshowSpec {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            seconds_per_photo: DEFAULT_SECONDS_PER_PHOTO,
            frame_rate: DEFAULT_FRAME_RATE,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

impl SlideshowSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new spec with a different per-photo duration.
    pub fn with_seconds_per_photo(mut self, seconds: u32) -> Self {
        self.seconds_per_photo = seconds;
        self
    }

    /// Expected playable duration for `images` photos.
    pub fn expected_duration_secs(&self, images: usize) -> f64 {
        (images as u32 * self.seconds_per_photo) as f64
    }

    /// Convert to FFmpeg output arguments (codec, rate, pixel format).
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]
    }
}
