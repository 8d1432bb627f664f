//! Domain models shared across Medley components.

pub mod asset;
pub mod job;
pub mod upload;

pub use asset::{
    AccessLevel, Asset, AssetStatus, AssetType, AssetVersion, Rendition, TechnicalMetadata,
};
pub use job::{ImageOutputFormat, JobPayload, QueueName, TargetResolution};
pub use upload::{
    CreateUploadRequest, CreateUploadResponse, DownloadUrlResponse, FinalizeUploadRequest,
    UpdateAssetRequest,
};
