//! In-memory asset repository.
//!
//! Backs tests and single-node deployments. Patch application here is the
//! reference semantics for any durable implementation of the interface.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use medley_core::models::asset::Asset;
use medley_core::AppError;

use crate::repository::{
    AssetAnalytics, AssetFilter, AssetPatch, AssetRepository, SortOrder,
};

/// In-memory implementation of [`AssetRepository`].
#[derive(Clone, Default)]
pub struct InMemoryAssetRepository {
    assets: Arc<RwLock<HashMap<Uuid, Asset>>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(filter: &AssetFilter, asset: &Asset) -> bool {
        if asset.organization_id != filter.organization_id {
            return false;
        }
        if let Some(project_id) = filter.project_id {
            if asset.project_id != project_id {
                return false;
            }
        }
        if let Some(asset_type) = filter.asset_type {
            if asset.asset_type != asset_type {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if asset.status != status {
                return false;
            }
        }
        if let Some(access_level) = filter.access_level {
            if asset.access_level != access_level {
                return false;
            }
        }
        if let Some(uploaded_by) = filter.uploaded_by {
            if asset.uploaded_by != uploaded_by {
                return false;
            }
        }
        if let Some(ref tag) = filter.tag {
            if !asset.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(ref search) = filter.search {
            let needle = search.to_lowercase();
            if !asset.original_filename.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(after) = filter.created_after {
            if asset.created_at < after {
                return false;
            }
        }
        if let Some(before) = filter.created_before {
            if asset.created_at > before {
                return false;
            }
        }
        true
    }

    fn apply_patch(asset: &mut Asset, patch: AssetPatch) -> Result<(), AppError> {
        if let Some(status) = patch.status {
            asset.status = status;
        }
        if let Some(error) = patch.processing_error {
            asset.processing_error = error;
        }
        if let Some(metadata) = patch.metadata {
            asset.metadata = metadata;
        }
        for (name, rendition) in patch.upsert_renditions {
            asset.renditions.insert(name, rendition);
        }
        if let Some(tags) = patch.replace_tags {
            asset.tags = tags;
        }
        if let Some(tags) = patch.add_tags {
            for tag in tags {
                if !asset.tags.contains(&tag) {
                    asset.tags.push(tag);
                }
            }
        }
        if let Some(access_level) = patch.access_level {
            asset.access_level = access_level;
        }
        if let Some(custom) = patch.merge_custom_metadata {
            asset.custom_metadata.extend(custom);
        }
        if let Some(version) = patch.push_version {
            if version.version_number != asset.latest_version + 1 {
                return Err(AppError::Repository(format!(
                    "Version {} does not follow latest version {}",
                    version.version_number, asset.latest_version
                )));
            }
            asset.push_version(version);
        }
        asset.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn create(&self, asset: Asset) -> Result<Asset, AppError> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(&asset.id) {
            return Err(AppError::Repository(format!(
                "Asset {} already exists",
                asset.id
            )));
        }
        assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let assets = self.assets.read().await;
        Ok(assets.get(&id).filter(|a| !a.is_deleted()).cloned())
    }

    async fn find_by_checksum(
        &self,
        organization_id: Uuid,
        checksum: &str,
    ) -> Result<Option<Asset>, AppError> {
        let assets = self.assets.read().await;
        Ok(assets
            .values()
            .find(|a| {
                a.organization_id == organization_id && a.checksum == checksum && !a.is_deleted()
            })
            .cloned())
    }

    async fn list(&self, filter: &AssetFilter) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.read().await;
        let mut matched: Vec<Asset> = assets
            .values()
            .filter(|a| !a.is_deleted() && Self::matches(filter, a))
            .cloned()
            .collect();

        match filter.sort {
            SortOrder::CreatedDesc => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::CreatedAsc => matched.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::SizeDesc => matched.sort_by(|a, b| b.file_size_bytes.cmp(&a.file_size_bytes)),
            SortOrder::SizeAsc => matched.sort_by(|a, b| a.file_size_bytes.cmp(&b.file_size_bytes)),
        }

        let offset = filter.offset.unwrap_or(0);
        let matched: Vec<Asset> = matched
            .into_iter()
            .skip(offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(matched)
    }

    async fn update_fields(&self, id: Uuid, patch: AssetPatch) -> Result<Asset, AppError> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(&id)
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", id)))?;
        Self::apply_patch(asset, patch)?;
        Ok(asset.clone())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), AppError> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(&id)
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", id)))?;
        asset.view_count += 1;
        Ok(())
    }

    async fn increment_download_count(&self, id: Uuid) -> Result<(), AppError> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(&id)
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", id)))?;
        asset.download_count += 1;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", id)))?;
        if asset.deleted_at.is_none() {
            asset.deleted_at = Some(Utc::now());
            asset.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn aggregate_analytics(
        &self,
        organization_id: Uuid,
        project_id: Option<Uuid>,
    ) -> Result<AssetAnalytics, AppError> {
        let assets = self.assets.read().await;
        let mut analytics = AssetAnalytics::default();

        for asset in assets.values() {
            if asset.organization_id != organization_id || asset.is_deleted() {
                continue;
            }
            if let Some(project_id) = project_id {
                if asset.project_id != project_id {
                    continue;
                }
            }
            analytics.total_assets += 1;
            analytics.total_size_bytes += asset.file_size_bytes;
            analytics.total_views += asset.view_count;
            analytics.total_downloads += asset.download_count;
            *analytics
                .by_status
                .entry(asset.status.to_string())
                .or_insert(0) += 1;
            *analytics
                .by_type
                .entry(asset.asset_type.to_string())
                .or_insert(0) += 1;
        }

        Ok(analytics)
    }
}
