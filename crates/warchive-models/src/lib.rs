//! Shared data models for the Weather Archive video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Photo and video rows
//! - Selection windows
//! - Per-group outcomes and run summaries
//! - Slideshow encoding constants

pub mod encoding;
pub mod outcome;
pub mod photo;
pub mod video;
pub mod window;

// Re-export common types
pub use encoding::SlideshowSpec;
pub use outcome::{FailureStage, GroupFailure, GroupOutcome, GroupReport, RunSummary};
pub use photo::{LocationId, Photo, PhotoId};
pub use video::{video_object_key, NewVideo, TimeRange, Video, VideoRecordId};
pub use window::SelectionWindow;
