//! Video worker: transcoding to target resolutions, poster frames, and
//! preview clips.
//!
//! Concurrency for this worker is configured lower than the others because
//! each job is CPU/time expensive.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use medley_core::models::asset::Rendition;
use medley_core::models::job::{JobPayload, TargetResolution};
use medley_db::AssetPatch;
use medley_processing::FfmpegTool;
use medley_queue::{JobContext, JobHandler};
use medley_storage::{parse_storage_key, rendition_key};

use crate::context::WorkerContext;

/// Poster frames are taken at this offset into the source.
const POSTER_OFFSET_SECONDS: f64 = 2.0;

pub struct VideoWorker {
    ctx: WorkerContext,
    ffmpeg: FfmpegTool,
}

impl VideoWorker {
    pub fn new(ctx: WorkerContext, ffmpeg: FfmpegTool) -> Self {
        Self { ctx, ffmpeg }
    }

    async fn transcode(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        resolutions: &[TargetResolution],
        extract_poster: bool,
        job: &JobContext,
    ) -> Result<()> {
        let parsed = parse_storage_key(storage_key).context("Unparseable storage key")?;
        let scratch = self.ctx.scratch_dir(job.job().id)?;

        let data = self
            .ctx
            .storage
            .get_object(storage_key)
            .await
            .context("Failed to download original")?;
        let input = scratch.path().join("input.mp4");
        tokio::fs::write(&input, &data)
            .await
            .context("Failed to write transcode input")?;
        job.update_progress(5);

        let probe = self.ffmpeg.probe(&input).await.context("Probe failed")?;
        job.update_progress(10);

        let mut patch = AssetPatch::default();
        let count = resolutions.len().max(1);
        for (index, resolution) in resolutions.iter().enumerate() {
            let output = scratch.path().join(format!("{}.mp4", resolution.name));
            self.ffmpeg
                .transcode(&input, &output, resolution, probe.duration_seconds, |p| {
                    job.update_progress(stage_progress(index, count, p));
                })
                .await
                .with_context(|| format!("Transcode to {} failed", resolution.name))?;

            let transcoded = tokio::fs::read(&output)
                .await
                .context("Failed to read transcode output")?;
            let key = rendition_key(
                parsed.organization_id,
                parsed.project_id,
                parsed.asset_id,
                &resolution.name,
                &format!("{}.mp4", resolution.name),
            );
            let size = transcoded.len() as i64;
            self.ctx
                .storage
                .put_object(&key, Bytes::from(transcoded), "video/mp4")
                .await
                .with_context(|| format!("Failed to upload {}", resolution.name))?;

            patch.upsert_renditions.insert(
                resolution.name.clone(),
                Rendition {
                    storage_key: key,
                    content_type: "video/mp4".to_string(),
                    width: Some(resolution.width),
                    height: Some(resolution.height),
                    file_size_bytes: Some(size),
                    created_at: Utc::now(),
                },
            );
        }

        if extract_poster {
            let poster_path = scratch.path().join("poster.jpg");
            self.ffmpeg
                .extract_poster(&input, &poster_path, POSTER_OFFSET_SECONDS)
                .await
                .context("Poster extraction failed")?;
            let poster = tokio::fs::read(&poster_path)
                .await
                .context("Failed to read poster output")?;
            let key = rendition_key(
                parsed.organization_id,
                parsed.project_id,
                parsed.asset_id,
                "poster",
                "poster.jpg",
            );
            let size = poster.len() as i64;
            self.ctx
                .storage
                .put_object(&key, Bytes::from(poster), "image/jpeg")
                .await
                .context("Failed to upload poster")?;
            patch.upsert_renditions.insert(
                "poster".to_string(),
                Rendition {
                    storage_key: key,
                    content_type: "image/jpeg".to_string(),
                    width: probe.width,
                    height: probe.height,
                    file_size_bytes: Some(size),
                    created_at: Utc::now(),
                },
            );
        }
        job.update_progress(95);

        self.ctx.complete_asset(asset_id, patch).await?;
        job.update_progress(100);
        Ok(())
    }

    async fn preview_clip(
        &self,
        asset_id: Uuid,
        storage_key: &str,
        start_offset_seconds: f64,
        duration_seconds: f64,
        job: &JobContext,
    ) -> Result<()> {
        let parsed = parse_storage_key(storage_key).context("Unparseable storage key")?;
        let scratch = self.ctx.scratch_dir(job.job().id)?;

        let data = self
            .ctx
            .storage
            .get_object(storage_key)
            .await
            .context("Failed to download original")?;
        let input = scratch.path().join("input.mp4");
        tokio::fs::write(&input, &data)
            .await
            .context("Failed to write clip input")?;
        job.update_progress(20);

        let output = scratch.path().join("preview_clip.mp4");
        self.ffmpeg
            .preview_clip(&input, &output, start_offset_seconds, duration_seconds)
            .await
            .context("Preview clip failed")?;
        job.update_progress(70);

        let clip = tokio::fs::read(&output)
            .await
            .context("Failed to read clip output")?;
        let key = rendition_key(
            parsed.organization_id,
            parsed.project_id,
            parsed.asset_id,
            "preview_clip",
            "preview_clip.mp4",
        );
        let size = clip.len() as i64;
        self.ctx
            .storage
            .put_object(&key, Bytes::from(clip), "video/mp4")
            .await
            .context("Failed to upload preview clip")?;

        let mut patch = AssetPatch::default();
        patch.upsert_renditions.insert(
            "preview_clip".to_string(),
            Rendition {
                storage_key: key,
                content_type: "video/mp4".to_string(),
                width: None,
                height: None,
                file_size_bytes: Some(size),
                created_at: Utc::now(),
            },
        );
        self.ctx.complete_asset(asset_id, patch).await?;
        job.update_progress(100);
        Ok(())
    }

    async fn run(&self, payload: &JobPayload, job: &JobContext) -> Result<()> {
        match payload {
            JobPayload::TranscodeVideo {
                asset_id,
                storage_key,
                resolutions,
                extract_poster,
                ..
            } => {
                self.transcode(*asset_id, storage_key, resolutions, *extract_poster, job)
                    .await
            }
            JobPayload::GeneratePreviewClip {
                asset_id,
                storage_key,
                start_offset_seconds,
                duration_seconds,
                ..
            } => {
                self.preview_clip(
                    *asset_id,
                    storage_key,
                    *start_offset_seconds,
                    *duration_seconds,
                    job,
                )
                .await
            }
            _ => Err(anyhow!("Unexpected payload for video worker")),
        }
    }
}

/// Map per-resolution transcode progress into the 10-90 band of overall job
/// progress, split evenly across resolutions.
fn stage_progress(index: usize, count: usize, percent: u8) -> u8 {
    let done = index * 100 + percent.min(100) as usize;
    (10 + done * 80 / (count * 100)) as u8
}

#[async_trait]
impl JobHandler for VideoWorker {
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
