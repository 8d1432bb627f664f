//! Metadata worker: extracts technical metadata and suggests tags.
//!
//! Runs before the type-specific workers so extracted dimensions/duration
//! survive even if a later job fails.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use medley_core::constants::MAX_APPLIED_TAGS;
use medley_core::models::asset::{AssetType, TechnicalMetadata};
use medley_core::models::job::JobPayload;
use medley_db::AssetPatch;
use medley_processing::{
    estimate_pdf_page_count, introspect, suggest_tags, text_stats, FfmpegTool,
};
use medley_queue::{JobContext, JobHandler};

use crate::context::WorkerContext;

pub struct MetadataWorker {
    ctx: WorkerContext,
    ffmpeg: FfmpegTool,
}

impl MetadataWorker {
    pub fn new(ctx: WorkerContext, ffmpeg: FfmpegTool) -> Self {
        Self { ctx, ffmpeg }
    }

    async fn extract(
        &self,
        job: &JobContext,
        data: &[u8],
        content_type: &str,
    ) -> Result<TechnicalMetadata> {
        let mut metadata = TechnicalMetadata::default();

        match AssetType::from_content_type(content_type) {
            AssetType::Image => {
                let info = introspect(data).context("Image introspection failed")?;
                metadata.width = Some(info.width);
                metadata.height = Some(info.height);
                metadata.format = Some(info.format);
                metadata.color_space = Some(info.color_space);
                metadata.has_alpha = Some(info.has_alpha);
                metadata.frame_count = info.frame_count;
            }
            AssetType::Video | AssetType::Audio => {
                let scratch = self.ctx.scratch_dir(job.job().id)?;
                let input = scratch.path().join("input");
                tokio::fs::write(&input, data)
                    .await
                    .context("Failed to write probe input")?;
                let probe = self.ffmpeg.probe(&input).await.context("Media probe failed")?;
                metadata.duration_seconds = Some(probe.duration_seconds);
                metadata.width = probe.width;
                metadata.height = probe.height;
                metadata.video_codec = probe.video_codec;
                metadata.audio_codec = probe.audio_codec;
                metadata.bitrate = probe.bitrate;
                metadata.frame_rate = probe.frame_rate;
                metadata.sample_rate = probe.sample_rate;
                metadata.channels = probe.channels;
            }
            AssetType::Document => {
                if medley_processing::document::is_text_content_type(content_type) {
                    let content = String::from_utf8_lossy(data);
                    let stats = text_stats(&content);
                    metadata.char_count = Some(stats.char_count);
                    metadata.word_count = Some(stats.word_count);
                    metadata.line_count = Some(stats.line_count);
                } else if content_type.eq_ignore_ascii_case("application/pdf") {
                    metadata.page_count = Some(estimate_pdf_page_count(data.len() as u64));
                }
            }
            AssetType::Archive | AssetType::Other => {}
        }

        Ok(metadata)
    }

    async fn run(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        let JobPayload::ExtractMetadata {
            asset_id,
            storage_key,
            content_type,
            ..
        } = payload
        else {
            return Err(anyhow!("Unexpected payload for metadata worker"));
        };

        let Some(asset) = self.ctx.repo.find_by_id(*asset_id).await? else {
            // Asset was deleted between dispatch and delivery; nothing to do.
            tracing::info!(asset_id = %asset_id, "Asset gone, skipping metadata extraction");
            return Ok(());
        };

        let data = self
            .ctx
            .storage
            .get_object(storage_key)
            .await
            .context("Failed to download object")?;
        job.update_progress(20);

        let metadata = self.extract(job, &data, content_type).await?;
        job.update_progress(80);

        let suggested = suggest_tags(&asset.original_filename, &metadata);
        let applied: Vec<String> = suggested.into_iter().take(MAX_APPLIED_TAGS).collect();

        tracing::info!(
            asset_id = %asset_id,
            asset_type = %asset.asset_type,
            tag_count = applied.len(),
            "Metadata extracted"
        );

        let mut patch = AssetPatch::default();
        patch.metadata = Some(metadata);
        patch.add_tags = Some(applied);
        self.ctx.complete_asset(*asset_id, patch).await?;
        job.update_progress(100);
        Ok(())
    }
}

#[async_trait]
impl JobHandler for MetadataWorker {
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
    use std::io::Cursor;
    use std::sync::Arc;

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            32,
            image::Rgb([10, 20, 30]),
        ));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn worker(repo: Arc<InMemoryAssetRepository>, storage: Arc<InMemoryGateway>) -> MetadataWorker {
        let ctx = WorkerContext::new(repo, storage);
        MetadataWorker::new(ctx, FfmpegTool::new("ffmpeg".into(), "ffprobe".into()).unwrap())
    }

    #[tokio::test]
    async fn test_image_metadata_and_tags_written() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("alpine-sunrise.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(&asset.storage_key, Bytes::from(png_bytes()), "image/png")
            .await
            .unwrap();

        let payload = JobPayload::ExtractMetadata {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "image/png".to_string(),
        };
        let worker = worker(repo.clone(), storage);
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Completed);
        assert_eq!(updated.metadata.width, Some(64));
        assert_eq!(updated.metadata.height, Some(32));
        assert_eq!(updated.metadata.format.as_deref(), Some("png"));
        assert!(updated.tags.contains(&"alpine".to_string()));
        assert!(updated.tags.contains(&"sunrise".to_string()));
        assert!(updated.tags.contains(&"landscape".to_string()));
    }

    #[tokio::test]
    async fn test_text_document_statistics() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("notes.txt", "text/plain", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(
                &asset.storage_key,
                Bytes::from_static(b"one two three\nfour five\n"),
                "text/plain",
            )
            .await
            .unwrap();

        let payload = JobPayload::ExtractMetadata {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "text/plain".to_string(),
        };
        let worker = worker(repo.clone(), storage);
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.metadata.word_count, Some(5));
        assert_eq!(updated.metadata.line_count, Some(2));
    }

    #[tokio::test]
    async fn test_pdf_page_estimate() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("report.pdf", "application/pdf", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(
                &asset.storage_key,
                Bytes::from(vec![0u8; 150_000]),
                "application/pdf",
            )
            .await
            .unwrap();

        let payload = JobPayload::ExtractMetadata {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "application/pdf".to_string(),
        };
        let worker = worker(repo.clone(), storage);
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.metadata.page_count, Some(3));
    }

    #[tokio::test]
    async fn test_failure_records_truncated_error_and_reraises() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("broken.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        // Object present but not decodable as an image.
        storage
            .put_object(&asset.storage_key, Bytes::from_static(b"junk"), "image/png")
            .await
            .unwrap();

        let payload = JobPayload::ExtractMetadata {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            content_type: "image/png".to_string(),
        };
        let worker = worker(repo.clone(), storage);
        let result = worker.handle(&payload, &make_job_context(&payload)).await;
        assert!(result.is_err());

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Failed);
        let error = updated.processing_error.unwrap();
        assert!(!error.is_empty());
        assert!(error.len() <= medley_core::constants::PROCESSING_ERROR_MAX_LEN);
    }

    #[tokio::test]
    async fn test_deleted_asset_is_skipped() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let payload = JobPayload::ExtractMetadata {
            asset_id: uuid::Uuid::new_v4(),
            organization_id: uuid::Uuid::new_v4(),
            storage_key: "org/a/missing".to_string(),
            content_type: "image/png".to_string(),
        };
        let worker = worker(repo, storage);
        // Unknown asset: a no-op success, not an error worth retrying.
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();
    }
}
