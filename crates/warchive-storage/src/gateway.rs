//! Storage gateway trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Minimal object storage surface used by the pipeline.
///
/// Implementations own no pipeline state; `put` has upsert semantics.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. Missing objects yield `StorageError::NotFound`.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Store an object, replacing any existing one.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Store a local file.
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        let data = tokio::fs::read(path).await?;
        self.put(key, data, content_type).await
    }

    /// Bucket the store writes to.
    fn bucket(&self) -> &str;

    /// Public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
