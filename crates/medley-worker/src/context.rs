//! Shared worker context and the success/failure halves of the worker
//! contract.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use medley_core::constants::PROCESSING_ERROR_MAX_LEN;
use medley_core::models::asset::AssetStatus;
use medley_db::{AssetPatch, AssetRepository};
use medley_storage::StorageGateway;

/// Handles a worker needs to do its work: the asset repository for result
/// writes and the storage gateway for byte transfer. Constructed once at
/// process start and passed into each worker explicitly.
#[derive(Clone)]
pub struct WorkerContext {
    pub repo: Arc<dyn AssetRepository>,
    pub storage: Arc<dyn StorageGateway>,
}

impl WorkerContext {
    pub fn new(repo: Arc<dyn AssetRepository>, storage: Arc<dyn StorageGateway>) -> Self {
        Self { repo, storage }
    }

    /// Per-job scratch directory, isolated by job id so concurrently running
    /// jobs never collide. Removed on drop, success or failure.
    pub fn scratch_dir(&self, job_id: Uuid) -> anyhow::Result<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("medley-job-{}-", job_id))
            .tempdir()?;
        Ok(dir)
    }

    /// Success half of the worker contract: apply the output patch with
    /// status `completed`.
    pub async fn complete_asset(
        &self,
        asset_id: Uuid,
        mut patch: AssetPatch,
    ) -> anyhow::Result<()> {
        patch.status = Some(AssetStatus::Completed);
        patch.processing_error = Some(None);
        self.repo.update_fields(asset_id, patch).await?;
        Ok(())
    }

    /// Failure half of the worker contract: record a truncated error and set
    /// status `failed`. Best-effort — a repository error here is logged, not
    /// propagated, so the original processing error stays the job's failure.
    pub async fn fail_asset(&self, asset_id: Uuid, error: &anyhow::Error) {
        let mut patch = AssetPatch::status(AssetStatus::Failed);
        patch.processing_error = Some(Some(truncate_error(&format!("{:#}", error))));
        if let Err(repo_err) = self.repo.update_fields(asset_id, patch).await {
            tracing::error!(
                asset_id = %asset_id,
                error = %repo_err,
                processing_error = %error,
                "Failed to record processing error on asset"
            );
        }
    }
}

/// Truncate an error message on a char boundary to the configured cap.
pub fn truncate_error(message: &str) -> String {
    if message.len() <= PROCESSING_ERROR_MAX_LEN {
        return message.to_string();
    }
    let mut end = PROCESSING_ERROR_MAX_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
