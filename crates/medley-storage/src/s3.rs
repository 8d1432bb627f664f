use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::time::Duration;

use crate::traits::{ObjectInfo, PresignedUrl, StorageError, StorageGateway, StorageResult};

/// S3 storage gateway.
///
/// Invokes S3 (or an S3-compatible provider) through `object_store`; it owns
/// no business logic. Presigned URLs come from the SDK signer, so upload and
/// download bytes never flow through this process on the API path.
#[derive(Clone)]
pub struct S3Gateway {
    store: AmazonS3,
    bucket: String,
}

impl S3Gateway {
    /// Create a new S3Gateway.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Gateway { store, bucket })
    }

    async fn signed_url(
        &self,
        method: Method,
        storage_key: &str,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        let location = Path::from(storage_key.to_string());
        let expires_at = Utc::now()
            + ChronoDuration::from_std(ttl)
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let url_result: ObjectResult<_> = self.store.signed_url(method, &location, ttl).await;

        let url = url_result
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?
            .to_string();

        Ok(PresignedUrl { url, expires_at })
    }
}

#[async_trait]
impl StorageGateway for S3Gateway {
    async fn presign_upload(
        &self,
        storage_key: &str,
        content_type: &str,
        content_length: i64,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        let presigned = self.signed_url(Method::PUT, storage_key, ttl).await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            content_length = content_length,
            ttl_secs = ttl.as_secs(),
            "Generated presigned upload URL"
        );

        Ok(presigned)
    }

    async fn presign_download(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        self.signed_url(Method::GET, storage_key, ttl).await
    }

    async fn head_object(&self, storage_key: &str) -> StorageResult<Option<ObjectInfo>> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(ObjectInfo {
                size_bytes: meta.size,
                last_modified: Some(meta.last_modified),
            })),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete_object(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn get_object(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    fn provider(&self) -> &'static str {
        "s3"
    }
}
