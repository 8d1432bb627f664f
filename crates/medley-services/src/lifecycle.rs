//! Asset lifecycle service.
//!
//! Orchestrates the two-phase upload protocol (initiate → direct-to-storage
//! transfer → finalize), read paths, updates, soft delete, retry, and
//! download-URL issuance. This service is the single writer of asset status
//! transitions on the API side; workers own the terminal states.
//!
//! Bytes never flow through these operations — upload and download travel
//! directly between the client and the object store via presigned URLs, so
//! request latency is decoupled from payload size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use medley_core::config::Config;
use medley_core::models::asset::{Asset, AssetStatus, AssetType, AssetVersion, TechnicalMetadata};
use medley_core::models::upload::{
    CreateUploadRequest, CreateUploadResponse, DownloadUrlResponse, FinalizeUploadRequest,
    UpdateAssetRequest,
};
use medley_core::validation::{validate_checksum, validate_custom_metadata, validate_extension};
use medley_core::AppError;
use medley_db::{AssetAnalytics, AssetFilter, AssetPatch, AssetRepository};
use medley_storage::{original_key, StorageGateway};

use crate::access::{can_access, Actor, AssetAction};
use crate::dispatcher::JobDispatcher;

/// The core asset lifecycle orchestrator. Dependencies are injected at
/// construction; there is no global state.
#[derive(Clone)]
pub struct AssetLifecycleService {
    repo: Arc<dyn AssetRepository>,
    storage: Arc<dyn StorageGateway>,
    dispatcher: JobDispatcher,
    config: Config,
}

impl AssetLifecycleService {
    pub fn new(
        repo: Arc<dyn AssetRepository>,
        storage: Arc<dyn StorageGateway>,
        dispatcher: JobDispatcher,
        config: Config,
    ) -> Self {
        Self {
            repo,
            storage,
            dispatcher,
            config,
        }
    }

    /// Initiate a two-phase upload: validate, deduplicate by checksum, create
    /// the asset in `uploading` status with version 1 reserved, and return a
    /// presigned upload URL bound to the computed storage key.
    #[tracing::instrument(skip(self, request), fields(
        organization_id = %request.organization_id,
        filename = %request.filename,
        operation = "create_upload"
    ))]
    pub async fn create_upload(
        &self,
        request: CreateUploadRequest,
        actor: &Actor,
    ) -> Result<CreateUploadResponse, AppError> {
        request.validate()?;
        validate_checksum(&request.checksum)?;
        validate_extension(&request.filename, &request.content_type)?;
        validate_custom_metadata(&request.custom_metadata)?;

        if request.organization_id != actor.organization_id {
            return Err(AppError::AccessDenied(
                "Uploads are scoped to the actor's organization".to_string(),
            ));
        }

        if request.file_size_bytes > self.config.max_upload_size_bytes {
            return Err(AppError::PayloadTooLarge {
                size: request.file_size_bytes,
                limit: self.config.max_upload_size_bytes,
            });
        }

        if self
            .repo
            .find_by_checksum(request.organization_id, &request.checksum)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateAsset {
                checksum: request.checksum,
            });
        }

        let asset_id = Uuid::new_v4();
        let asset_type = AssetType::from_content_type(&request.content_type);
        let storage_key = original_key(
            request.organization_id,
            request.project_id,
            asset_id,
            1,
            &request.filename,
        );

        let upload_ttl = Duration::from_secs(self.config.upload_url_ttl_secs);
        let presigned = self
            .storage
            .presign_upload(
                &storage_key,
                &request.content_type,
                request.file_size_bytes,
                upload_ttl,
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let now = Utc::now();
        let asset = Asset {
            id: asset_id,
            organization_id: request.organization_id,
            project_id: request.project_id,
            uploaded_by: actor.user_id,
            original_filename: request.filename,
            content_type: request.content_type,
            asset_type,
            file_size_bytes: request.file_size_bytes,
            checksum: request.checksum,
            status: AssetStatus::Uploading,
            processing_error: None,
            deleted_at: None,
            storage_provider: self.storage.provider().to_string(),
            storage_key: storage_key.clone(),
            latest_version: 1,
            versions: vec![AssetVersion {
                version_number: 1,
                storage_key: storage_key.clone(),
                file_size_bytes: request.file_size_bytes,
                created_by: actor.user_id,
                created_at: now,
            }],
            metadata: TechnicalMetadata::default(),
            renditions: HashMap::new(),
            tags: request.tags,
            custom_metadata: request.custom_metadata,
            access_level: request.access_level,
            view_count: 0,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };

        let asset = self.repo.create(asset).await?;

        tracing::info!(
            asset_id = %asset.id,
            asset_type = %asset.asset_type,
            storage_key = %storage_key,
            "Upload initiated"
        );

        Ok(CreateUploadResponse {
            asset,
            upload_url: presigned.url,
            storage_key,
            expires_at: presigned.expires_at,
        })
    }

    /// Finalize a direct upload: verify ownership, exact checksum/size
    /// equality, and object existence, then transition to `processing` and
    /// dispatch jobs. A verification failure leaves the asset in `uploading`
    /// so the client may retry the transfer.
    #[tracing::instrument(skip(self, request), fields(asset_id = %asset_id, operation = "finalize_upload"))]
    pub async fn finalize_upload(
        &self,
        asset_id: Uuid,
        request: FinalizeUploadRequest,
        actor: &Actor,
    ) -> Result<Asset, AppError> {
        request.validate()?;

        let asset = self.require_asset(asset_id).await?;
        if asset.uploaded_by != actor.user_id {
            return Err(AppError::AccessDenied(
                "Only the uploader may finalize an upload".to_string(),
            ));
        }
        if asset.status != AssetStatus::Uploading {
            return Err(AppError::InvalidStatus {
                operation: "finalize",
                required: AssetStatus::Uploading,
                current: asset.status,
            });
        }

        if request.actual_checksum != asset.checksum {
            return Err(AppError::ChecksumMismatch {
                declared: asset.checksum,
                actual: request.actual_checksum,
            });
        }
        if request.actual_file_size_bytes != asset.file_size_bytes {
            return Err(AppError::SizeMismatch {
                declared: asset.file_size_bytes,
                actual: request.actual_file_size_bytes,
            });
        }

        let exists = self
            .storage
            .head_object(&asset.storage_key)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        if exists.is_none() {
            return Err(AppError::ObjectMissing(asset.storage_key));
        }

        let asset = self
            .repo
            .update_fields(asset_id, AssetPatch::status(AssetStatus::Processing))
            .await?;

        // Dispatch failure must not fail finalize: the asset stays in
        // `processing` and is unstuck via retry_processing.
        if let Err(e) = self.dispatcher.dispatch(&asset).await {
            tracing::error!(
                asset_id = %asset_id,
                error = %e,
                "Job dispatch failed after finalize; asset left in processing"
            );
        }

        tracing::info!(asset_id = %asset_id, "Upload finalized");
        Ok(asset)
    }

    /// Fetch a single asset. Requires view access; bumps the view counter
    /// best-effort.
    pub async fn get_by_id(&self, asset_id: Uuid, actor: &Actor) -> Result<Asset, AppError> {
        let asset = self.require_asset(asset_id).await?;
        self.require_access(&asset, actor, AssetAction::View)?;

        if let Err(e) = self.repo.increment_view_count(asset_id).await {
            tracing::warn!(asset_id = %asset_id, error = %e, "Failed to increment view count");
        }
        Ok(asset)
    }

    /// List assets matching `filter`. The repository applies the filter; the
    /// rows are then re-checked against the access policy (defense in depth).
    pub async fn list(&self, mut filter: AssetFilter, actor: &Actor) -> Result<Vec<Asset>, AppError> {
        // The organization boundary is never the caller's to choose.
        filter.organization_id = actor.organization_id;
        let assets = self.repo.list(&filter).await?;
        Ok(assets
            .into_iter()
            .filter(|asset| can_access(asset, actor, AssetAction::View))
            .collect())
    }

    /// Patch tags, access level, and custom metadata. Custom metadata is
    /// merged, never replaced wholesale.
    pub async fn update(
        &self,
        asset_id: Uuid,
        request: UpdateAssetRequest,
        actor: &Actor,
    ) -> Result<Asset, AppError> {
        let asset = self.require_asset(asset_id).await?;
        self.require_access(&asset, actor, AssetAction::Edit)?;

        if let Some(ref custom) = request.custom_metadata {
            validate_custom_metadata(custom)?;
        }

        let mut patch = AssetPatch::default();
        patch.replace_tags = request.replace_tags;
        patch.add_tags = request.add_tags;
        patch.access_level = request.access_level;
        patch.merge_custom_metadata = request.custom_metadata;

        let updated = self.repo.update_fields(asset_id, patch).await?;
        Ok(updated)
    }

    /// Issue a short-TTL presigned download URL. Only valid for completed
    /// assets; bumps the download counter.
    pub async fn get_download_url(
        &self,
        asset_id: Uuid,
        actor: &Actor,
    ) -> Result<DownloadUrlResponse, AppError> {
        let asset = self.require_asset(asset_id).await?;
        self.require_access(&asset, actor, AssetAction::Download)?;

        if asset.status != AssetStatus::Completed {
            return Err(AppError::InvalidStatus {
                operation: "download",
                required: AssetStatus::Completed,
                current: asset.status,
            });
        }

        let presigned = self
            .storage
            .presign_download(
                &asset.storage_key,
                Duration::from_secs(self.config.download_url_ttl_secs),
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if let Err(e) = self.repo.increment_download_count(asset_id).await {
            tracing::warn!(asset_id = %asset_id, error = %e, "Failed to increment download count");
        }

        Ok(DownloadUrlResponse {
            download_url: presigned.url,
            expires_at: presigned.expires_at,
        })
    }

    /// Soft-delete: the record is retained but disappears from every lookup
    /// path. A delayed cleanup job removes the storage objects; enqueue
    /// failure does not fail the delete.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, operation = "soft_delete"))]
    pub async fn soft_delete(&self, asset_id: Uuid, actor: &Actor) -> Result<(), AppError> {
        let asset = self.require_asset(asset_id).await?;
        self.require_access(&asset, actor, AssetAction::Delete)?;

        self.repo.soft_delete(asset_id).await?;

        if let Err(e) = self.dispatcher.dispatch_cleanup(&asset).await {
            tracing::warn!(
                asset_id = %asset_id,
                error = %e,
                "Failed to enqueue storage cleanup; objects remain until next cleanup pass"
            );
        }

        tracing::info!(asset_id = %asset_id, "Asset soft-deleted");
        Ok(())
    }

    /// Retry processing for a failed asset: clears the error, transitions
    /// back to `processing`, and re-dispatches.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, operation = "retry_processing"))]
    pub async fn retry_processing(&self, asset_id: Uuid, actor: &Actor) -> Result<Asset, AppError> {
        let asset = self.require_asset(asset_id).await?;
        self.require_access(&asset, actor, AssetAction::Edit)?;

        if asset.status != AssetStatus::Failed {
            return Err(AppError::InvalidStatus {
                operation: "retry",
                required: AssetStatus::Failed,
                current: asset.status,
            });
        }

        let mut patch = AssetPatch::status(AssetStatus::Processing);
        patch.processing_error = Some(None);
        let asset = self.repo.update_fields(asset_id, patch).await?;

        if let Err(e) = self.dispatcher.dispatch(&asset).await {
            tracing::error!(
                asset_id = %asset_id,
                error = %e,
                "Job dispatch failed on retry; asset left in processing"
            );
        }

        tracing::info!(asset_id = %asset_id, "Processing retry dispatched");
        Ok(asset)
    }

    /// Aggregate analytics for the actor's organization.
    pub async fn analytics(
        &self,
        project_id: Option<Uuid>,
        actor: &Actor,
    ) -> Result<AssetAnalytics, AppError> {
        self.repo
            .aggregate_analytics(actor.organization_id, project_id)
            .await
    }

    async fn require_asset(&self, asset_id: Uuid) -> Result<Asset, AppError> {
        self.repo
            .find_by_id(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset not found: {}", asset_id)))
    }

    fn require_access(
        &self,
        asset: &Asset,
        actor: &Actor,
        action: AssetAction,
    ) -> Result<(), AppError> {
        if can_access(asset, actor, action) {
            Ok(())
        } else {
            Err(AppError::AccessDenied(format!(
                "Actor {} may not {:?} asset {}",
                actor.user_id, action, asset.id
            )))
        }
    }
}
