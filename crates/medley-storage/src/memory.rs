//! In-memory storage gateway.
//!
//! Holds objects in a map and issues fake signed URLs. Used by tests and
//! single-node runs; the simulated client-side PUT is a direct `put_object`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;

use crate::traits::{ObjectInfo, PresignedUrl, StorageError, StorageGateway, StorageResult};

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory implementation of [`StorageGateway`].
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects, for test assertions.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    fn expires_at(ttl: Duration) -> StorageResult<DateTime<Utc>> {
        Ok(Utc::now()
            + ChronoDuration::from_std(ttl)
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?)
    }

    /// Deterministic fake signature so signed URLs are stable for a given
    /// key and expiry.
    fn sign(storage_key: &str, expires_at: DateTime<Utc>) -> String {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in storage_key
            .as_bytes()
            .iter()
            .chain(expires_at.timestamp().to_be_bytes().iter())
        {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        format!("{:016x}", hash)
    }

    fn signed_url(method: &str, storage_key: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "https://storage.medley.local/{}?X-Method={}&X-Expires={}&X-Signature={}",
            storage_key,
            method,
            expires_at.timestamp(),
            Self::sign(storage_key, expires_at)
        )
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn presign_upload(
        &self,
        storage_key: &str,
        _content_type: &str,
        _content_length: i64,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        let expires_at = Self::expires_at(ttl)?;
        Ok(PresignedUrl {
            url: Self::signed_url("PUT", storage_key, expires_at),
            expires_at,
        })
    }

    async fn presign_download(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        let expires_at = Self::expires_at(ttl)?;
        Ok(PresignedUrl {
            url: Self::signed_url("GET", storage_key, expires_at),
            expires_at,
        })
    }

    async fn head_object(&self, storage_key: &str) -> StorageResult<Option<ObjectInfo>> {
        let objects = self.objects.read().await;
        Ok(objects.get(storage_key).map(|o| ObjectInfo {
            size_bytes: o.data.len() as u64,
            last_modified: Some(o.last_modified),
        }))
    }

    async fn delete_object(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(storage_key);
        Ok(())
    }

    async fn get_object(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.read().await;
        objects
            .get(storage_key)
            .map(|o| o.data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        self.objects.write().await.insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn provider(&self) -> &'static str {
        "memory"
    }
}
