//! Configuration module
//!
//! Environment-driven configuration for the lifecycle service and worker
//! processes. Constructed once at process start and passed explicitly into
//! the components that need it.

use std::env;
use std::str::FromStr;

use crate::constants::{DOWNLOAD_URL_TTL_SECS, MAX_UPLOAD_SIZE_BYTES, UPLOAD_URL_TTL_SECS};

const DEFAULT_METADATA_CONCURRENCY: usize = 4;
const DEFAULT_IMAGE_CONCURRENCY: usize = 4;
const DEFAULT_VIDEO_CONCURRENCY: usize = 1;
const DEFAULT_GENERIC_CONCURRENCY: usize = 2;
const DEFAULT_CLEANUP_CONCURRENCY: usize = 2;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Which storage gateway implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    S3,
    Memory,
}

impl FromStr for StorageBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackendKind::S3),
            "memory" => Ok(StorageBackendKind::Memory),
            other => Err(anyhow::anyhow!("Invalid storage backend: {}", other)),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub storage_backend: StorageBackendKind,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...)
    pub s3_endpoint: Option<String>,

    // Upload protocol
    pub max_upload_size_bytes: i64,
    pub upload_url_ttl_secs: u64,
    pub download_url_ttl_secs: u64,

    // External media tools
    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    // Worker pools (per-queue concurrency; video is deliberately low because
    // each job is CPU/time expensive)
    pub metadata_worker_concurrency: usize,
    pub image_worker_concurrency: usize,
    pub video_worker_concurrency: usize,
    pub generic_worker_concurrency: usize,
    pub cleanup_worker_concurrency: usize,

    /// Grace period granted to in-flight jobs on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackendKind::Memory,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            upload_url_ttl_secs: UPLOAD_URL_TTL_SECS,
            download_url_ttl_secs: DOWNLOAD_URL_TTL_SECS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            metadata_worker_concurrency: DEFAULT_METADATA_CONCURRENCY,
            image_worker_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            video_worker_concurrency: DEFAULT_VIDEO_CONCURRENCY,
            generic_worker_concurrency: DEFAULT_GENERIC_CONCURRENCY,
            cleanup_worker_concurrency: DEFAULT_CLEANUP_CONCURRENCY,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let config = Config {
            storage_backend: parse_env("MEDLEY_STORAGE_BACKEND", defaults.storage_backend),
            s3_bucket: env::var("MEDLEY_S3_BUCKET").ok(),
            s3_region: env::var("MEDLEY_S3_REGION").ok(),
            s3_endpoint: env::var("MEDLEY_S3_ENDPOINT").ok(),
            max_upload_size_bytes: parse_env(
                "MEDLEY_MAX_UPLOAD_SIZE_BYTES",
                defaults.max_upload_size_bytes,
            ),
            upload_url_ttl_secs: parse_env("MEDLEY_UPLOAD_URL_TTL_SECS", defaults.upload_url_ttl_secs),
            download_url_ttl_secs: parse_env(
                "MEDLEY_DOWNLOAD_URL_TTL_SECS",
                defaults.download_url_ttl_secs,
            ),
            ffmpeg_path: env::var("MEDLEY_FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("MEDLEY_FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            metadata_worker_concurrency: parse_env(
                "MEDLEY_METADATA_WORKER_CONCURRENCY",
                defaults.metadata_worker_concurrency,
            ),
            image_worker_concurrency: parse_env(
                "MEDLEY_IMAGE_WORKER_CONCURRENCY",
                defaults.image_worker_concurrency,
            ),
            video_worker_concurrency: parse_env(
                "MEDLEY_VIDEO_WORKER_CONCURRENCY",
                defaults.video_worker_concurrency,
            ),
            generic_worker_concurrency: parse_env(
                "MEDLEY_GENERIC_WORKER_CONCURRENCY",
                defaults.generic_worker_concurrency,
            ),
            cleanup_worker_concurrency: parse_env(
                "MEDLEY_CLEANUP_WORKER_CONCURRENCY",
                defaults.cleanup_worker_concurrency,
            ),
            shutdown_grace_secs: parse_env("MEDLEY_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackendKind::S3 {
            if self.s3_bucket.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("MEDLEY_S3_BUCKET is required for the s3 storage backend");
            }
            if self.s3_region.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("MEDLEY_S3_REGION is required for the s3 storage backend");
            }
        }
        if self.max_upload_size_bytes <= 0 {
            anyhow::bail!("MEDLEY_MAX_UPLOAD_SIZE_BYTES must be positive");
        }
        if self.video_worker_concurrency == 0 || self.metadata_worker_concurrency == 0 {
            anyhow::bail!("Worker concurrency must be at least 1");
        }
        Ok(())
    }
}
