use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an asset.
///
/// Transitions are directional: `uploading → processing → {completed, failed}`,
/// and `failed → pending/processing` only via explicit retry. The lifecycle
/// service is the single writer of API-side transitions; workers write the
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Uploading,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AssetStatus {
    /// Whether the transition `self → next` is a legal edge of the lifecycle
    /// state machine. `Completed → Completed` is allowed so that at-least-once
    /// job re-delivery can idempotently re-write the terminal state.
    pub fn can_transition_to(&self, next: AssetStatus) -> bool {
        use AssetStatus::*;
        matches!(
            (*self, next),
            (Uploading, Processing)
                | (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Pending)
                | (Failed, Processing)
                | (Completed, Completed)
        )
    }
}

impl Display for AssetStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetStatus::Uploading => write!(f, "uploading"),
            AssetStatus::Pending => write!(f, "pending"),
            AssetStatus::Processing => write!(f, "processing"),
            AssetStatus::Completed => write!(f, "completed"),
            AssetStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for AssetStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(AssetStatus::Uploading),
            "pending" => Ok(AssetStatus::Pending),
            "processing" => Ok(AssetStatus::Processing),
            "completed" => Ok(AssetStatus::Completed),
            "failed" => Ok(AssetStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid asset status: {}", s)),
        }
    }
}

/// Coarse asset type, derived from the declared MIME type at upload initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl AssetType {
    /// Derive the asset type from a MIME type.
    pub fn from_content_type(content_type: &str) -> AssetType {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();

        if normalized.starts_with("image/") {
            AssetType::Image
        } else if normalized.starts_with("video/") {
            AssetType::Video
        } else if normalized.starts_with("audio/") {
            AssetType::Audio
        } else if normalized.starts_with("text/") {
            AssetType::Document
        } else {
            match normalized.as_str() {
                "application/pdf"
                | "application/msword"
                | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "application/vnd.ms-excel"
                | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                | "application/rtf"
                | "application/json" => AssetType::Document,
                "application/zip"
                | "application/x-tar"
                | "application/gzip"
                | "application/x-7z-compressed"
                | "application/x-rar-compressed" => AssetType::Archive,
                _ => AssetType::Other,
            }
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetType::Image => write!(f, "image"),
            AssetType::Video => write!(f, "video"),
            AssetType::Audio => write!(f, "audio"),
            AssetType::Document => write!(f, "document"),
            AssetType::Archive => write!(f, "archive"),
            AssetType::Other => write!(f, "other"),
        }
    }
}

/// Visibility of an asset to actors other than its uploader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Private,
    Organization,
    Public,
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccessLevel::Private => write!(f, "private"),
            AccessLevel::Organization => write!(f, "organization"),
            AccessLevel::Public => write!(f, "public"),
        }
    }
}

/// Technical metadata extracted by the metadata worker. All fields are
/// optional; which ones are populated depends on the asset type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub bitrate: Option<u64>,
    pub frame_rate: Option<f32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub page_count: Option<u32>,
    pub format: Option<String>,
    pub color_space: Option<String>,
    pub has_alpha: Option<bool>,
    pub frame_count: Option<u32>,
    pub char_count: Option<u64>,
    pub word_count: Option<u64>,
    pub line_count: Option<u64>,
}

/// Immutable snapshot of an asset's original content. A new version never
/// mutates an old one; version numbers start at 1 and are strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVersion {
    pub version_number: i32,
    pub storage_key: String,
    pub file_size_bytes: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A derived artifact keyed by name (`thumbnail_small`, `preview_720p`, ...).
/// Renditions are additive: processing only adds or overwrites by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendition {
    pub storage_key: String,
    pub content_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// The central content entity, tracked from upload initiation through
/// processing to delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub uploaded_by: Uuid,

    pub original_filename: String,
    pub content_type: String,
    pub asset_type: AssetType,
    pub file_size_bytes: i64,
    /// Content hash in `algorithm:hex` form, unique per organization among
    /// non-deleted assets.
    pub checksum: String,

    pub status: AssetStatus,
    pub processing_error: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub storage_provider: String,
    pub storage_key: String,
    pub latest_version: i32,
    pub versions: Vec<AssetVersion>,

    pub metadata: TechnicalMetadata,
    pub renditions: HashMap<String, Rendition>,
    pub tags: Vec<String>,
    pub custom_metadata: HashMap<String, String>,
    pub access_level: AccessLevel,

    pub view_count: i64,
    pub download_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The checksum algorithm prefix, e.g. `sha256`.
    pub fn checksum_algorithm(&self) -> Option<&str> {
        self.checksum.split(':').next()
    }

    /// Storage keys owned by this asset: every version plus every rendition.
    /// Used by the cleanup job after a soft delete.
    pub fn all_storage_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .versions
            .iter()
            .map(|v| v.storage_key.clone())
            .collect();
        if !keys.contains(&self.storage_key) {
            keys.push(self.storage_key.clone());
        }
        keys.extend(self.renditions.values().map(|r| r.storage_key.clone()));
        keys
    }

    /// Append a version, keeping `latest_version == versions.len()`.
    /// Returns the new version number.
    pub fn push_version(&mut self, version: AssetVersion) -> i32 {
        debug_assert_eq!(version.version_number, self.versions.len() as i32 + 1);
        self.latest_version = version.version_number;
        self.storage_key = version.storage_key.clone();
        self.versions.push(version);
        self.latest_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_legal_edges() {
        use AssetStatus::*;
        assert!(Uploading.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Processing));
        assert!(Failed.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Processing));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_status_transitions_illegal_edges() {
        use AssetStatus::*;
        assert!(!Uploading.can_transition_to(Completed));
        assert!(!Uploading.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Uploading));
        assert!(!Processing.can_transition_to(Uploading));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AssetStatus::Uploading,
            AssetStatus::Pending,
            AssetStatus::Processing,
            AssetStatus::Completed,
            AssetStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<AssetStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn test_asset_type_from_content_type() {
        assert_eq!(
            AssetType::from_content_type("image/png"),
            AssetType::Image
        );
        assert_eq!(
            AssetType::from_content_type("video/mp4"),
            AssetType::Video
        );
        assert_eq!(
            AssetType::from_content_type("audio/mpeg"),
            AssetType::Audio
        );
        assert_eq!(
            AssetType::from_content_type("application/pdf"),
            AssetType::Document
        );
        assert_eq!(
            AssetType::from_content_type("text/plain; charset=utf-8"),
            AssetType::Document
        );
        assert_eq!(
            AssetType::from_content_type("application/zip"),
            AssetType::Archive
        );
        assert_eq!(
            AssetType::from_content_type("application/octet-stream"),
            AssetType::Other
        );
    }

    fn sample_asset() -> Asset {
        let now = Utc::now();
        Asset {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            original_filename: "photo.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            asset_type: AssetType::Image,
            file_size_bytes: 1024,
            checksum: "sha256:abcd".to_string(),
            status: AssetStatus::Uploading,
            processing_error: None,
            deleted_at: None,
            storage_provider: "s3".to_string(),
            storage_key: "org/a/proj/b/asset/c/original/v1/photo.jpg".to_string(),
            latest_version: 1,
            versions: vec![AssetVersion {
                version_number: 1,
                storage_key: "org/a/proj/b/asset/c/original/v1/photo.jpg".to_string(),
                file_size_bytes: 1024,
                created_by: Uuid::new_v4(),
                created_at: now,
            }],
            metadata: TechnicalMetadata::default(),
            renditions: HashMap::new(),
            tags: vec![],
            custom_metadata: HashMap::new(),
            access_level: AccessLevel::Private,
            view_count: 0,
            download_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_push_version_keeps_invariant() {
        let mut asset = sample_asset();
        assert_eq!(asset.latest_version, asset.versions.len() as i32);

        let v2 = AssetVersion {
            version_number: 2,
            storage_key: "org/a/proj/b/asset/c/original/v2/photo.jpg".to_string(),
            file_size_bytes: 2048,
            created_by: asset.uploaded_by,
            created_at: Utc::now(),
        };
        let n = asset.push_version(v2);
        assert_eq!(n, 2);
        assert_eq!(asset.latest_version, 2);
        assert_eq!(asset.versions.len(), 2);
        assert!(asset.storage_key.contains("/v2/"));
    }

    #[test]
    fn test_all_storage_keys_includes_versions_and_renditions() {
        let mut asset = sample_asset();
        asset.renditions.insert(
            "thumbnail_small".to_string(),
            Rendition {
                storage_key: "org/a/proj/b/asset/c/renditions/thumbnail_small/photo.jpg"
                    .to_string(),
                content_type: "image/jpeg".to_string(),
                width: Some(256),
                height: Some(171),
                file_size_bytes: Some(9000),
                created_at: Utc::now(),
            },
        );
        let keys = asset.all_storage_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.contains("/original/v1/")));
        assert!(keys.iter().any(|k| k.contains("/renditions/thumbnail_small/")));
    }
}
