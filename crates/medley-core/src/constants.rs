//! Application-wide constants.

/// Upper bound on declared upload size (5 GiB). Uploads above this are rejected
/// at initiation time, before any storage interaction.
pub const MAX_UPLOAD_SIZE_BYTES: i64 = 5 * 1024 * 1024 * 1024;

/// TTL for presigned upload (PUT) URLs.
pub const UPLOAD_URL_TTL_SECS: u64 = 3600;

/// TTL for presigned download (GET) URLs. Short by design: download URLs are
/// issued per request.
pub const DOWNLOAD_URL_TTL_SECS: u64 = 300;

/// Processing errors written to an asset are truncated to this many bytes so a
/// pathological subprocess stderr cannot bloat the record.
pub const PROCESSING_ERROR_MAX_LEN: usize = 500;

/// Maximum number of tags the metadata worker may suggest for an asset.
pub const MAX_SUGGESTED_TAGS: usize = 10;

/// Of the suggested tags, at most this many are written onto the asset.
pub const MAX_APPLIED_TAGS: usize = 5;

/// Delay before a storage cleanup job becomes eligible to run.
pub const CLEANUP_DELAY_SECS: u64 = 30;

/// Sanitized filenames embedded in storage keys are capped at this length.
pub const MAX_KEY_FILENAME_LEN: usize = 128;

/// Limits for user-supplied custom metadata.
pub const MAX_CUSTOM_METADATA_KEYS: usize = 20;
pub const MAX_CUSTOM_METADATA_KEY_LEN: usize = 64;
pub const MAX_CUSTOM_METADATA_VALUE_LEN: usize = 512;
