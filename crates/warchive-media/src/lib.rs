//! FFmpeg CLI wrapper for slideshow assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Timeout-bounded process execution
//! - Concat-demuxer slideshows normalized to a fixed canvas
//! - Post-encode verification of the slideshow with FFprobe

pub mod command;
pub mod error;
pub mod filters;
pub mod inspect;
pub mod progress;
pub mod slideshow;

pub use command::{resolve_binary, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use inspect::{inspect_video, verify_slideshow, VideoInfo};
pub use progress::FfmpegProgress;
pub use slideshow::{FfmpegSlideshow, SlideshowEncoder};
