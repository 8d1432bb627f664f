//! Cleanup worker: deletes storage objects after a soft delete.
//!
//! The asset record is retained (soft-deleted); this worker only removes the
//! listed storage keys. Deletes are idempotent, so a retried job re-deleting
//! already-removed keys is harmless.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use medley_core::models::job::JobPayload;
use medley_queue::{JobContext, JobHandler};

use crate::context::WorkerContext;

const DELETE_CONCURRENCY: usize = 16;

pub struct CleanupWorker {
    ctx: WorkerContext,
}

impl CleanupWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for CleanupWorker {
    async fn handle(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        let JobPayload::CleanupStorage {
            asset_id,
            storage_keys,
            ..
        } = payload
        else {
            return Err(anyhow!("Unexpected payload for cleanup worker"));
        };

        let storage = self.ctx.storage.clone();
        let failures: Vec<String> = stream::iter(storage_keys.clone())
            .map(|key| {
                let storage = storage.clone();
                async move {
                    match storage.delete_object(&key).await {
                        Ok(()) => None,
                        Err(e) => {
                            tracing::warn!(
                                storage_key = %key,
                                error = %e,
                                "Failed to delete storage object"
                            );
                            Some(key)
                        }
                    }
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .filter_map(|failure| async move { failure })
            .collect()
            .await;
        job.update_progress(100);

        if failures.is_empty() {
            tracing::info!(
                asset_id = %asset_id,
                deleted = storage_keys.len(),
                "Storage cleanup complete"
            );
            Ok(())
        } else {
            // Let the queue retry; deletes already done stay deleted.
            Err(anyhow!(
                "Failed to delete {} of {} storage objects",
                failures.len(),
                storage_keys.len()
            ))
        }
    }
}
