//! Job dispatcher: decides, per asset type, which processing jobs to enqueue
//! and in what order.

use std::sync::Arc;

use anyhow::{Context, Result};

use medley_core::models::asset::{Asset, AssetType};
use medley_core::models::job::{JobPayload, TargetResolution};
use medley_queue::{EnqueueOptions, JobQueue};

/// Routes assets to processing jobs. Always enqueues metadata extraction
/// first, then exactly one type-specific job.
#[derive(Clone)]
pub struct JobDispatcher {
    queue: Arc<dyn JobQueue>,
}

impl JobDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Dispatch the processing jobs for a finalized (or retried) asset.
    /// Payloads carry only the fields the worker needs, never the full asset
    /// document.
    pub async fn dispatch(&self, asset: &Asset) -> Result<()> {
        self.queue
            .enqueue(
                JobPayload::ExtractMetadata {
                    asset_id: asset.id,
                    organization_id: asset.organization_id,
                    storage_key: asset.storage_key.clone(),
                    content_type: asset.content_type.clone(),
                },
                EnqueueOptions::default(),
            )
            .await
            .context("Failed to enqueue metadata extraction")?;

        let type_specific = match asset.asset_type {
            AssetType::Image => JobPayload::GenerateThumbnails {
                asset_id: asset.id,
                organization_id: asset.organization_id,
                storage_key: asset.storage_key.clone(),
            },
            AssetType::Video => JobPayload::TranscodeVideo {
                asset_id: asset.id,
                organization_id: asset.organization_id,
                storage_key: asset.storage_key.clone(),
                resolutions: TargetResolution::default_ladder(),
                extract_poster: true,
            },
            AssetType::Audio | AssetType::Document | AssetType::Archive | AssetType::Other => {
                JobPayload::ProcessAsset {
                    asset_id: asset.id,
                    organization_id: asset.organization_id,
                    storage_key: asset.storage_key.clone(),
                    content_type: asset.content_type.clone(),
                }
            }
        };

        let queue_name = type_specific.queue();
        self.queue
            .enqueue(type_specific, EnqueueOptions::default())
            .await
            .with_context(|| format!("Failed to enqueue {} job", queue_name))?;

        tracing::info!(
            asset_id = %asset.id,
            asset_type = %asset.asset_type,
            "Processing jobs dispatched"
        );
        Ok(())
    }

    /// Enqueue the delayed storage-cleanup job for a soft-deleted asset.
    /// The cleanup queue's profile supplies the delay.
    pub async fn dispatch_cleanup(&self, asset: &Asset) -> Result<()> {
        self.queue
            .enqueue(
                JobPayload::CleanupStorage {
                    asset_id: asset.id,
                    organization_id: asset.organization_id,
                    storage_keys: asset.all_storage_keys(),
                },
                EnqueueOptions::default(),
            )
            .await
            .context("Failed to enqueue storage cleanup")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use medley_core::models::asset::{
        AccessLevel, AssetStatus, AssetVersion, TechnicalMetadata,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingQueue {
        enqueued: Mutex<Vec<JobPayload>>,
        fail: bool,
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue(&self, payload: JobPayload, _options: EnqueueOptions) -> Result<Uuid> {
            if self.fail {
                anyhow::bail!("queue unavailable");
            }
            self.enqueued.lock().unwrap().push(payload);
            Ok(Uuid::new_v4())
        }
    }

    fn asset_of_type(content_type: &str) -> Asset {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Asset {
            id,
            organization_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            original_filename: "f".to_string(),
            content_type: content_type.to_string(),
            asset_type: AssetType::from_content_type(content_type),
            file_size_bytes: 1,
            checksum: "sha256:00".to_string(),
            status: AssetStatus::Processing,
            processing_error: None,
            deleted_at: None,
            storage_provider: "memory".to_string(),
            storage_key: "org/a/proj/b/asset/c/original/v1/f".to_string(),
            latest_version: 1,
            versions: vec![AssetVersion {
                version_number: 1,
                storage_key: "org/a/proj/b/asset/c/original/v1/f".to_string(),
                file_size_bytes: 1,
                created_by: Uuid::new_v4(),
                created_at: now,
            }],
            metadata: TechnicalMetadata::default(),
            renditions: HashMap::new(),
            tags: vec![],
            custom_metadata: HashMap::new(),
            access_level: AccessLevel::Private,
            view_count: 0,
            download_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_image_dispatch_metadata_first_then_thumbnails() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = JobDispatcher::new(queue.clone());
        dispatcher.dispatch(&asset_of_type("image/png")).await.unwrap();

        let enqueued = queue.enqueued.lock().unwrap();
        assert_eq!(enqueued.len(), 2);
        assert!(matches!(enqueued[0], JobPayload::ExtractMetadata { .. }));
        assert!(matches!(enqueued[1], JobPayload::GenerateThumbnails { .. }));
    }

    #[tokio::test]
    async fn test_video_dispatch_enqueues_transcode_with_ladder_and_poster() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = JobDispatcher::new(queue.clone());
        dispatcher.dispatch(&asset_of_type("video/mp4")).await.unwrap();

        let enqueued = queue.enqueued.lock().unwrap();
        assert!(matches!(enqueued[0], JobPayload::ExtractMetadata { .. }));
        match &enqueued[1] {
            JobPayload::TranscodeVideo {
                resolutions,
                extract_poster,
                ..
            } => {
                assert_eq!(resolutions.len(), 2);
                assert!(extract_poster);
            }
            other => panic!("Expected transcode job, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_types_fall_back_to_generic_job() {
        for content_type in ["audio/mpeg", "application/pdf", "application/zip", "application/octet-stream"] {
            let queue = Arc::new(RecordingQueue::default());
            let dispatcher = JobDispatcher::new(queue.clone());
            dispatcher.dispatch(&asset_of_type(content_type)).await.unwrap();

            let enqueued = queue.enqueued.lock().unwrap();
            assert_eq!(enqueued.len(), 2);
            assert!(matches!(enqueued[1], JobPayload::ProcessAsset { .. }));
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_bubbles_to_caller() {
        let queue = Arc::new(RecordingQueue {
            fail: true,
            ..RecordingQueue::default()
        });
        let dispatcher = JobDispatcher::new(queue);
        assert!(dispatcher.dispatch(&asset_of_type("image/png")).await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_carries_every_storage_key() {
        let queue = Arc::new(RecordingQueue::default());
        let dispatcher = JobDispatcher::new(queue.clone());
        let mut asset = asset_of_type("video/mp4");
        asset.renditions.insert(
            "poster".to_string(),
            medley_core::models::asset::Rendition {
                storage_key: "org/a/proj/b/asset/c/renditions/poster/poster.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                width: None,
                height: None,
                file_size_bytes: None,
                created_at: Utc::now(),
            },
        );
        dispatcher.dispatch_cleanup(&asset).await.unwrap();

        let enqueued = queue.enqueued.lock().unwrap();
        match &enqueued[0] {
            JobPayload::CleanupStorage { storage_keys, .. } => {
                assert_eq!(storage_keys.len(), 2);
            }
            other => panic!("Expected cleanup job, got {:?}", other),
        }
    }
}
