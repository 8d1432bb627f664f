//! Generic fallback worker for asset types without a specialized pipeline
//! (archives, unknown binaries). Verifies the object is present and marks
//! the asset completed; metadata extraction has already run.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use medley_core::models::job::JobPayload;
use medley_db::AssetPatch;
use medley_queue::{JobContext, JobHandler};

use crate::context::WorkerContext;

pub struct GenericWorker {
    ctx: WorkerContext,
}

impl GenericWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        let JobPayload::ProcessAsset {
            asset_id,
            storage_key,
            content_type,
            ..
        } = payload
        else {
            return Err(anyhow!("Unexpected payload for generic worker"));
        };

        let info = self
            .ctx
            .storage
            .head_object(storage_key)
            .await
            .context("Failed to check object")?
            .ok_or_else(|| anyhow!("Object missing in storage: {}", storage_key))?;
        job.update_progress(50);

        tracing::info!(
            asset_id = %asset_id,
            content_type = %content_type,
            size_bytes = info.size_bytes,
            "Generic processing verified object"
        );

        self.ctx.complete_asset(*asset_id, AssetPatch::default()).await?;
        job.update_progress(100);
        Ok(())
    }
}

#[async_trait]
impl JobHandler for GenericWorker {
    async fn handle(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        match self.run(payload, job).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.ctx.fail_asset(payload.asset_id(), &error).await;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests_support::{make_asset, make_job_context};
    use bytes::Bytes;
    use medley_core::models::asset::AssetStatus;
    use medley_db::{AssetRepository, InMemoryAssetRepository};
    use medley_storage::{InMemoryGateway, StorageGateway};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_completes_when_object_present() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("bundle.zip", "application/zip", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(&asset.storage_key, Bytes::from_static(b"PK"), "application/zip")
            .await
            .unwrap();

        let payload = JobPayload::ProcessAsset {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "application/zip".to_string(),
        };
        let worker = GenericWorker::new(WorkerContext::new(repo.clone(), storage));
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Completed);
    }

    #[tokio::test]
    async fn test_fails_when_object_missing() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("bundle.zip", "application/zip", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();

        let payload = JobPayload::ProcessAsset {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "application/zip".to_string(),
        };
        let worker = GenericWorker::new(WorkerContext::new(repo.clone(), storage));
        assert!(worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .is_err());

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Failed);
    }
}
