use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::asset::{AccessLevel, Asset};

/// Request to initiate a two-phase upload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUploadRequest {
    pub organization_id: Uuid,
    pub project_id: Uuid,
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared file size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size_bytes: i64,
    /// Content checksum in `algorithm:hex` form
    #[validate(length(
        min = 1,
        max = 200,
        message = "Checksum must be between 1 and 200 characters"
    ))]
    pub checksum: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub custom_metadata: HashMap<String, String>,
}

/// Response containing the created asset and direct-upload coordinates.
#[derive(Debug, Serialize)]
pub struct CreateUploadResponse {
    pub asset: Asset,
    /// Presigned URL for the direct PUT to object storage
    pub upload_url: String,
    /// Storage key the client must upload to
    pub storage_key: String,
    /// Upload URL expiration time
    pub expires_at: DateTime<Utc>,
}

/// Request to finalize a direct upload after the client's PUT completed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FinalizeUploadRequest {
    /// Checksum of the bytes actually uploaded, `algorithm:hex` form
    #[validate(length(min = 1, max = 200))]
    pub actual_checksum: String,
    /// Size of the bytes actually uploaded
    #[validate(range(min = 1))]
    pub actual_file_size_bytes: i64,
}

/// Patch for mutable asset fields. Tags can be added (union) or replaced;
/// custom metadata is merged, never replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAssetRequest {
    #[serde(default)]
    pub add_tags: Option<Vec<String>>,
    #[serde(default)]
    pub replace_tags: Option<Vec<String>>,
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub custom_metadata: Option<HashMap<String, String>>,
}

/// Short-lived download coordinates for a completed asset.
#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}
