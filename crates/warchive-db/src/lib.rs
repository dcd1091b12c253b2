//! Postgres repositories for photos and videos.
//!
//! This crate provides:
//! - Repository traits the pipeline depends on
//! - `sqlx` implementations against the shared `photos`/`videos` tables
//! - Typed row decoding that quarantines malformed rows
//! - Pool construction and idempotent schema bootstrap

pub mod error;
pub mod pool;
pub mod repos;
pub mod rows;
pub mod schema;

pub use error::{DbError, DbResult};
pub use pool::{connect, DbConfig};
pub use repos::{PgPhotoRepository, PgVideoRepository, PhotoRepository, VideoRepository};
pub use schema::ensure_schema;
