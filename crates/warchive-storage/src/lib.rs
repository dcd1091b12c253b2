//! Object storage gateway.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait the pipeline stages talk to
//! - An S3 implementation (AWS or any S3-compatible endpoint)
//! - Key helpers for the `processed/` and `videos/` namespaces

pub mod client;
pub mod error;
pub mod gateway;
pub mod keys;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use gateway::ObjectStore;
pub use keys::{processed_key_from_url, public_object_url};
