//! Storage gateway abstraction trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A time-boxed, credential-scoped URL for direct client-to-storage transfer.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Metadata returned by a HEAD request against a storage key.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage gateway abstraction.
///
/// The lifecycle service uses the presign/head/delete operations; upload and
/// download bytes flow directly between the client and the object store, never
/// through the API. Workers, which run with storage credentials, additionally
/// use the `get_object`/`put_object` byte paths to fetch originals and write
/// renditions.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Generate a presigned PUT URL scoped to `storage_key`, the declared
    /// content type, and length.
    async fn presign_upload(
        &self,
        storage_key: &str,
        content_type: &str,
        content_length: i64,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl>;

    /// Generate a presigned GET URL for direct download.
    async fn presign_download(&self, storage_key: &str, ttl: Duration)
        -> StorageResult<PresignedUrl>;

    /// HEAD an object. Returns `None` when the object does not exist.
    async fn head_object(&self, storage_key: &str) -> StorageResult<Option<ObjectInfo>>;

    /// Delete an object by key. Deleting a missing object is not an error.
    async fn delete_object(&self, storage_key: &str) -> StorageResult<()>;

    /// Download an object's bytes (worker path).
    async fn get_object(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Upload bytes to a specific key (worker path, e.g. renditions).
    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Provider tag recorded on assets, e.g. `"s3"`.
    fn provider(&self) -> &'static str;
}
