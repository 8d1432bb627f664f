//! Asset repository interface.
//!
//! Updates go through [`AssetPatch`], an explicit atomic field patch, instead
//! of read-modify-write of whole documents: the store applies exactly the
//! fields present in the patch. Reads never follow implicit joins; callers
//! get the denormalized asset document as stored.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use medley_core::models::asset::{
    AccessLevel, Asset, AssetStatus, AssetType, AssetVersion, Rendition, TechnicalMetadata,
};
use medley_core::AppError;

/// Sort order for asset listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    CreatedDesc,
    CreatedAsc,
    SizeDesc,
    SizeAsc,
}

/// Filter for `list`. `organization_id` is always required; every other
/// field narrows the result set.
#[derive(Debug, Clone)]
pub struct AssetFilter {
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub asset_type: Option<AssetType>,
    pub status: Option<AssetStatus>,
    pub access_level: Option<AccessLevel>,
    pub uploaded_by: Option<Uuid>,
    /// Matches assets carrying this tag.
    pub tag: Option<String>,
    /// Case-insensitive substring match on the original filename.
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: SortOrder,
}

impl AssetFilter {
    pub fn for_organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            project_id: None,
            asset_type: None,
            status: None,
            access_level: None,
            uploaded_by: None,
            tag: None,
            search: None,
            created_after: None,
            created_before: None,
            limit: None,
            offset: None,
            sort: SortOrder::default(),
        }
    }
}

/// Atomic field patch. Only the fields set are applied; `processing_error`
/// uses a nested Option so callers can clear it explicitly.
#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub status: Option<AssetStatus>,
    pub processing_error: Option<Option<String>>,
    pub metadata: Option<TechnicalMetadata>,
    /// Renditions to add or overwrite by key. Renditions are never removed
    /// by a patch.
    pub upsert_renditions: HashMap<String, Rendition>,
    pub add_tags: Option<Vec<String>>,
    pub replace_tags: Option<Vec<String>>,
    pub access_level: Option<AccessLevel>,
    /// Merged into existing custom metadata, never replacing it wholesale.
    pub merge_custom_metadata: Option<HashMap<String, String>>,
    /// Appends a version; the version number must be `latest_version + 1`.
    pub push_version: Option<AssetVersion>,
}

impl AssetPatch {
    pub fn status(status: AssetStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.processing_error.is_none()
            && self.metadata.is_none()
            && self.upsert_renditions.is_empty()
            && self.add_tags.is_none()
            && self.replace_tags.is_none()
            && self.access_level.is_none()
            && self.merge_custom_metadata.is_none()
            && self.push_version.is_none()
    }
}

/// Aggregate analytics for an organization (optionally scoped to a project).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetAnalytics {
    pub total_assets: i64,
    pub total_size_bytes: i64,
    pub by_status: HashMap<String, i64>,
    pub by_type: HashMap<String, i64>,
    pub total_views: i64,
    pub total_downloads: i64,
}

/// Durable asset store interface.
///
/// Soft-deleted assets are excluded from every lookup and listing path; they
/// are retained by the store but invisible through this interface except to
/// `soft_delete` itself (idempotent).
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn create(&self, asset: Asset) -> Result<Asset, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError>;

    /// Dedup lookup: non-deleted asset in `organization_id` with this
    /// checksum, if any.
    async fn find_by_checksum(
        &self,
        organization_id: Uuid,
        checksum: &str,
    ) -> Result<Option<Asset>, AppError>;

    async fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, AppError>;

    /// Apply a field patch and return the updated asset.
    async fn update_fields(&self, id: Uuid, patch: AssetPatch) -> Result<Asset, AppError>;

    async fn increment_view_count(&self, id: Uuid) -> Result<(), AppError>;

    async fn increment_download_count(&self, id: Uuid) -> Result<(), AppError>;

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError>;

    async fn aggregate_analytics(
        &self,
        organization_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<AssetAnalytics, AppError>;
}
