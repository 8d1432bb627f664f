use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical queue names. Each queue carries an independent priority/retry/
/// backoff profile (see `medley-queue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    AssetProcessing,
    ImageProcessing,
    VideoProcessing,
    MetadataExtraction,
    Cleanup,
}

impl QueueName {
    pub const ALL: [QueueName; 5] = [
        QueueName::AssetProcessing,
        QueueName::ImageProcessing,
        QueueName::VideoProcessing,
        QueueName::MetadataExtraction,
        QueueName::Cleanup,
    ];
}

impl Display for QueueName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            QueueName::AssetProcessing => write!(f, "asset-processing"),
            QueueName::ImageProcessing => write!(f, "image-processing"),
            QueueName::VideoProcessing => write!(f, "video-processing"),
            QueueName::MetadataExtraction => write!(f, "metadata-extraction"),
            QueueName::Cleanup => write!(f, "cleanup"),
        }
    }
}

impl FromStr for QueueName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset-processing" => Ok(QueueName::AssetProcessing),
            "image-processing" => Ok(QueueName::ImageProcessing),
            "video-processing" => Ok(QueueName::VideoProcessing),
            "metadata-extraction" => Ok(QueueName::MetadataExtraction),
            "cleanup" => Ok(QueueName::Cleanup),
            _ => Err(anyhow::anyhow!("Invalid queue name: {}", s)),
        }
    }
}

/// A transcode target for the video worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResolution {
    /// Rendition key the output is stored under, e.g. `preview_720p`.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl TargetResolution {
    pub fn preview_720p() -> Self {
        Self {
            name: "preview_720p".to_string(),
            width: 1280,
            height: 720,
            video_bitrate_kbps: 2500,
            audio_bitrate_kbps: 128,
        }
    }

    pub fn preview_1080p() -> Self {
        Self {
            name: "preview_1080p".to_string(),
            width: 1920,
            height: 1080,
            video_bitrate_kbps: 5000,
            audio_bitrate_kbps: 192,
        }
    }

    /// Default ladder enqueued by the dispatcher for video assets.
    pub fn default_ladder() -> Vec<Self> {
        vec![Self::preview_720p(), Self::preview_1080p()]
    }
}

/// Output format for the standalone optimize-image job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutputFormat {
    Jpeg,
    Png,
    WebP,
}

/// Typed job payloads, one variant per job kind.
///
/// Each payload carries the asset id, organization id, storage key, and the
/// minimal extra fields its worker needs — never the full asset document, so
/// jobs stay small and replayable. The variant determines the queue, giving
/// dispatcher and worker a compile-time contract per queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    ExtractMetadata {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
        content_type: String,
    },
    GenerateThumbnails {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
    },
    OptimizeImage {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
        format: ImageOutputFormat,
    },
    TranscodeVideo {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
        resolutions: Vec<TargetResolution>,
        extract_poster: bool,
    },
    GeneratePreviewClip {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
        start_offset_seconds: f64,
        duration_seconds: f64,
    },
    /// Generic fallback for asset types without a specialized worker.
    ProcessAsset {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_key: String,
        content_type: String,
    },
    /// Deletes the listed storage keys after a soft delete.
    CleanupStorage {
        asset_id: Uuid,
        organization_id: Uuid,
        storage_keys: Vec<String>,
    },
}

impl JobPayload {
    /// The queue this payload is routed to.
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::ExtractMetadata { .. } => QueueName::MetadataExtraction,
            JobPayload::GenerateThumbnails { .. } | JobPayload::OptimizeImage { .. } => {
                QueueName::ImageProcessing
            }
            JobPayload::TranscodeVideo { .. } | JobPayload::GeneratePreviewClip { .. } => {
                QueueName::VideoProcessing
            }
            JobPayload::ProcessAsset { .. } => QueueName::AssetProcessing,
            JobPayload::CleanupStorage { .. } => QueueName::Cleanup,
        }
    }

    /// Stable snake_case name of the job kind, used in logs and observers.
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::ExtractMetadata { .. } => "extract_metadata",
            JobPayload::GenerateThumbnails { .. } => "generate_thumbnails",
            JobPayload::OptimizeImage { .. } => "optimize_image",
            JobPayload::TranscodeVideo { .. } => "transcode_video",
            JobPayload::GeneratePreviewClip { .. } => "generate_preview_clip",
            JobPayload::ProcessAsset { .. } => "process_asset",
            JobPayload::CleanupStorage { .. } => "cleanup_storage",
        }
    }

    pub fn asset_id(&self) -> Uuid {
        match self {
            JobPayload::ExtractMetadata { asset_id, .. }
            | JobPayload::GenerateThumbnails { asset_id, .. }
            | JobPayload::OptimizeImage { asset_id, .. }
            | JobPayload::TranscodeVideo { asset_id, .. }
            | JobPayload::GeneratePreviewClip { asset_id, .. }
            | JobPayload::ProcessAsset { asset_id, .. }
            | JobPayload::CleanupStorage { asset_id, .. } => *asset_id,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        match self {
            JobPayload::ExtractMetadata {
                organization_id, ..
            }
            | JobPayload::GenerateThumbnails {
                organization_id, ..
            }
            | JobPayload::OptimizeImage {
                organization_id, ..
            }
            | JobPayload::TranscodeVideo {
                organization_id, ..
            }
            | JobPayload::GeneratePreviewClip {
                organization_id, ..
            }
            | JobPayload::ProcessAsset {
                organization_id, ..
            }
            | JobPayload::CleanupStorage {
                organization_id, ..
            } => *organization_id,
        }
    }
}
