//! Medley Workers
//!
//! The three specialized worker processes (metadata, image, video) plus the
//! generic fallback and storage-cleanup handlers. Each worker pulls from one
//! queue, performs one unit of work inside a per-job scratch directory, and
//! writes results back through the asset repository.
//!
//! Worker contract: on success the worker writes its outputs and sets the
//! asset status to `completed`; on any error it records a truncated
//! `processing_error`, sets `failed`, and re-raises so the queue's
//! retry/backoff policy governs re-delivery.

pub mod cleanup_worker;
pub mod context;
pub mod generic_worker;
pub mod image_worker;
pub mod metadata_worker;
pub mod video_worker;

use std::sync::Arc;

use medley_core::models::job::QueueName;
use medley_processing::FfmpegTool;
use medley_queue::InMemoryJobQueue;

pub use cleanup_worker::CleanupWorker;
pub use context::WorkerContext;
pub use generic_worker::GenericWorker;
pub use image_worker::ImageWorker;
pub use metadata_worker::MetadataWorker;
pub use video_worker::VideoWorker;

/// Bind every worker to its queue on the given broker.
pub async fn register_workers(
    queue: &Arc<InMemoryJobQueue>,
    ctx: WorkerContext,
    ffmpeg: FfmpegTool,
) {
    queue
        .register_handler(
            QueueName::MetadataExtraction,
            Arc::new(MetadataWorker::new(ctx.clone(), ffmpeg.clone())),
        )
        .await;
    queue
        .register_handler(
            QueueName::ImageProcessing,
            Arc::new(ImageWorker::new(ctx.clone())),
        )
        .await;
    queue
        .register_handler(
            QueueName::VideoProcessing,
            Arc::new(VideoWorker::new(ctx.clone(), ffmpeg)),
        )
        .await;
    queue
        .register_handler(
            QueueName::AssetProcessing,
            Arc::new(GenericWorker::new(ctx.clone())),
        )
        .await;
    queue
        .register_handler(QueueName::Cleanup, Arc::new(CleanupWorker::new(ctx)))
        .await;
}
