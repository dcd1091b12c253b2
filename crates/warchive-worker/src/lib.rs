//! Webcam slideshow worker.
//!
//! This crate provides:
//! - Windowed selection and per-location grouping of processed photos
//! - Staging of photo content into scoped temporary directories
//! - Idempotency checks against already published videos
//! - Slideshow assembly, upload and state transitions
//! - A run orchestrator with bounded parallelism and a run deadline

pub mod assembly;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod publish;
pub mod retrieval;
pub mod selection;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::GroupLogger;
pub use orchestrator::Pipeline;
pub use selection::{select_groups, Group, SelectionEngine};
