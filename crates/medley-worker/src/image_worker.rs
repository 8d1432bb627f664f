//! Image worker: fixed-size thumbnails and standalone optimized re-encodes.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use medley_core::models::asset::Rendition;
use medley_core::models::job::{ImageOutputFormat, JobPayload};
use medley_db::AssetPatch;
use medley_processing::{
    generate_thumbnail, optimize_image, ThumbnailSpec, THUMBNAIL_LARGE, THUMBNAIL_SMALL,
};
use medley_queue::{JobContext, JobHandler};
use medley_storage::{parse_storage_key, rendition_key, ParsedStorageKey};

use crate::context::WorkerContext;

pub struct ImageWorker {
    ctx: WorkerContext,
}

impl ImageWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Both thumbnail sizes are regenerated on every job; renditions are
    /// overwritten by key, so re-delivery is idempotent.
    async fn generate_thumbnails(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        job: &JobContext,
    ) -> Result<()> {
        let parsed = parse_storage_key(storage_key).context("Unparseable storage key")?;
        let data = self
            .ctx
            .storage
            .get_object(storage_key)
            .await
            .context("Failed to download original")?;
        job.update_progress(20);

        let mut patch = AssetPatch::default();
        let specs: [&ThumbnailSpec; 2] = [&THUMBNAIL_SMALL, &THUMBNAIL_LARGE];
        for (index, spec) in specs.iter().enumerate() {
            let thumbnail = generate_thumbnail(&data, spec)
                .with_context(|| format!("Thumbnail generation failed for {}", spec.name))?;

            let key = rendition_key(
                parsed.organization_id,
                parsed.project_id,
                parsed.asset_id,
                spec.name,
                &with_extension(&parsed.filename, "jpg"),
            );
            self.ctx
                .storage
                .put_object(&key, Bytes::from(thumbnail.data.clone()), "image/jpeg")
                .await
                .with_context(|| format!("Failed to upload {}", spec.name))?;

            patch.upsert_renditions.insert(
                spec.name.to_string(),
                Rendition {
                    storage_key: key,
                    content_type: "image/jpeg".to_string(),
                    width: Some(thumbnail.width),
                    height: Some(thumbnail.height),
                    file_size_bytes: Some(thumbnail.data.len() as i64),
                    created_at: Utc::now(),
                },
            );
            job.update_progress(20 + 35 * (index as u8 + 1));
        }

        self.ctx.complete_asset(asset_id, patch).await?;
        job.update_progress(100);
        Ok(())
    }

    /// Format-specific re-encode producing a standalone optimized object;
    /// not recorded as an asset rendition.
    async fn optimize(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        format: ImageOutputFormat,
        job: &JobContext,
    ) -> Result<()> {
        let parsed = parse_storage_key(storage_key).context("Unparseable storage key")?;
        let data = self
            .ctx
            .storage
            .get_object(storage_key)
            .await
            .context("Failed to download original")?;
        job.update_progress(30);

        let optimized = optimize_image(&data, format).context("Image optimization failed")?;
        job.update_progress(70);

        let (extension, content_type) = match format {
            ImageOutputFormat::Jpeg => ("jpg", "image/jpeg"),
            ImageOutputFormat::Png => ("png", "image/png"),
            ImageOutputFormat::WebP => ("webp", "image/webp"),
        };
        let key = optimized_object_key(&parsed, extension);
        self.ctx
            .storage
            .put_object(&key, Bytes::from(optimized), content_type)
            .await
            .context("Failed to upload optimized image")?;

        self.ctx.complete_asset(asset_id, AssetPatch::default()).await?;
        job.update_progress(100);
        Ok(())
    }

    async fn run(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        match payload {
            JobPayload::GenerateThumbnails {
                asset_id,
                storage_key,
                ..
            } => self.generate_thumbnails(*asset_id, storage_key, job).await,
            JobPayload::OptimizeImage {
                asset_id,
                storage_key,
                format,
                ..
            } => self.optimize(*asset_id, storage_key, *format, job).await,
            _ => Err(anyhow!("Unexpected payload for image worker")),
        }
    }
}

fn with_extension(filename: &str, extension: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.{}", stem, extension),
        _ => format!("{}.{}", filename, extension),
    }
}

fn optimized_object_key(parsed: &ParsedStorageKey, extension: &str) -> String {
    rendition_key(
        parsed.organization_id,
        parsed.project_id,
        parsed.asset_id,
        "optimized",
        &with_extension(&parsed.filename, extension),
    )
}

#[async_trait]
impl JobHandler for ImageWorker {
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
    use medley_core::models::asset::AssetStatus;
    use medley_db::{AssetRepository, InMemoryAssetRepository};
    use medley_storage::{InMemoryGateway, StorageGateway};
    use std::io::Cursor;
    use std::sync::Arc;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 100, 50]),
        ));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_thumbnails_generated_and_recorded() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("holiday photo.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(
                &asset.storage_key,
                Bytes::from(png_bytes(1920, 1080)),
                "image/png",
            )
            .await
            .unwrap();

        let payload = JobPayload::GenerateThumbnails {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
        };
        let worker = ImageWorker::new(WorkerContext::new(repo.clone(), storage.clone()));
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Completed);

        let small = &updated.renditions["thumbnail_small"];
        assert_eq!((small.width, small.height), (Some(256), Some(144)));
        assert!(small.storage_key.contains("/renditions/thumbnail_small/"));
        assert!(small.storage_key.ends_with(".jpg"));

        let large = &updated.renditions["thumbnail_large"];
        assert_eq!((large.width, large.height), (Some(640), Some(360)));

        // Both rendition objects exist in storage.
        assert!(storage.head_object(&small.storage_key).await.unwrap().is_some());
        assert!(storage.head_object(&large.storage_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_thumbnail_rerun_overwrites_renditions() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("pic.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(
                &asset.storage_key,
                Bytes::from(png_bytes(800, 600)),
                "image/png",
            )
            .await
            .unwrap();

        let payload = JobPayload::GenerateThumbnails {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
        };
        let worker = ImageWorker::new(WorkerContext::new(repo.clone(), storage.clone()));
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();
        // Re-delivery regenerates both sizes idempotently.
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.renditions.len(), 2);
    }

    #[tokio::test]
    async fn test_optimize_writes_standalone_object() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("pic.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();
        storage
            .put_object(
                &asset.storage_key,
                Bytes::from(png_bytes(64, 64)),
                "image/png",
            )
            .await
            .unwrap();

        let payload = JobPayload::OptimizeImage {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
            format: ImageOutputFormat::WebP,
        };
        let worker = ImageWorker::new(WorkerContext::new(repo.clone(), storage.clone()));
        worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .unwrap();

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Completed);
        // Standalone object, not an asset rendition field.
        assert!(updated.renditions.is_empty());

        let parsed = parse_storage_key(&asset.storage_key).unwrap();
        let optimized_key = optimized_object_key(&parsed, "webp");
        assert!(storage.head_object(&optimized_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_object_fails_asset() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let storage = Arc::new(InMemoryGateway::new());
        let asset = make_asset("pic.png", "image/png", AssetStatus::Processing);
        let asset = repo.create(asset).await.unwrap();

        let payload = JobPayload::GenerateThumbnails {
            asset_id: asset.id,
            organization_id: asset.organization_id,
            storage_key: asset.storage_key.clone(),
        };
        let worker = ImageWorker::new(WorkerContext::new(repo.clone(), storage));
        assert!(worker
            .handle(&payload, &make_job_context(&payload))
            .await
            .is_err());

        let updated = repo.find_by_id(asset.id).await.unwrap().unwrap();
        assert_eq!(updated.status, AssetStatus::Failed);
        assert!(updated.processing_error.is_some());
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("photo.png", "jpg"), "photo.jpg");
        assert_eq!(with_extension("archive.tar.gz", "jpg"), "archive.tar.jpg");
        assert_eq!(with_extension("noext", "jpg"), "noext.jpg");
    }
}
