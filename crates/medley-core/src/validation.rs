//! Input validation helpers shared by the lifecycle service.
//!
//! Routing-layer schema validation is an external collaborator; the checks
//! here are the ones the core re-verifies regardless of what sits in front
//! of it: checksum shape, filename/MIME consistency, and custom metadata
//! limits.

use crate::constants::{
    MAX_CUSTOM_METADATA_KEYS, MAX_CUSTOM_METADATA_KEY_LEN, MAX_CUSTOM_METADATA_VALUE_LEN,
};
use crate::error::AppError;
use std::collections::HashMap;

/// Validate a checksum of `algorithm:hex` form. The hex digest length must
/// match the named algorithm.
pub fn validate_checksum(checksum: &str) -> Result<(), AppError> {
    let (algorithm, digest) = checksum.split_once(':').ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Checksum must be in 'algorithm:hex' form, got '{}'",
            checksum
        ))
    })?;

    let expected_len = match algorithm {
        "sha256" => 64,
        "sha1" => 40,
        "md5" => 32,
        other => {
            return Err(AppError::InvalidInput(format!(
                "Unsupported checksum algorithm '{}'",
                other
            )))
        }
    };

    if digest.len() != expected_len || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::InvalidInput(format!(
            "Checksum digest must be {} hex characters for {}",
            expected_len, algorithm
        )));
    }

    Ok(())
}

/// Known extension → acceptable MIME types. Unknown extensions pass (the
/// check cannot judge them); known extensions must map to the declared type.
fn allowed_content_types(extension: &str) -> Option<&'static [&'static str]> {
    Some(match extension {
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "svg" => &["image/svg+xml"],
        "bmp" => &["image/bmp"],
        "tif" | "tiff" => &["image/tiff"],
        "mp4" => &["video/mp4"],
        "mov" => &["video/quicktime"],
        "webm" => &["video/webm"],
        "mkv" => &["video/x-matroska"],
        "avi" => &["video/x-msvideo"],
        "mp3" => &["audio/mpeg", "audio/mp3"],
        "wav" => &["audio/wav", "audio/x-wav"],
        "flac" => &["audio/flac"],
        "ogg" => &["audio/ogg", "application/ogg"],
        "aac" => &["audio/aac"],
        "m4a" => &["audio/mp4", "audio/x-m4a"],
        "pdf" => &["application/pdf"],
        "txt" => &["text/plain"],
        "md" => &["text/markdown", "text/plain"],
        "csv" => &["text/csv", "text/plain"],
        "json" => &["application/json", "text/plain"],
        "doc" => &["application/msword"],
        "docx" => {
            &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"]
        }
        "zip" => &["application/zip"],
        "tar" => &["application/x-tar"],
        "gz" => &["application/gzip"],
        _ => return None,
    })
}

/// Reject filenames whose extension contradicts the declared MIME type.
pub fn validate_extension(filename: &str, content_type: &str) -> Result<(), AppError> {
    let extension = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        // No extension at all: nothing to be inconsistent with.
        _ => return Ok(()),
    };

    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();

    match allowed_content_types(&extension) {
        Some(allowed) if !allowed.contains(&normalized.as_str()) => {
            Err(AppError::InvalidExtension {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Validate user-supplied custom metadata keys and values against the
/// configured limits.
pub fn validate_custom_metadata(metadata: &HashMap<String, String>) -> Result<(), AppError> {
    if metadata.len() > MAX_CUSTOM_METADATA_KEYS {
        return Err(AppError::InvalidInput(format!(
            "Too many custom metadata keys: {} exceeds limit of {}",
            metadata.len(),
            MAX_CUSTOM_METADATA_KEYS
        )));
    }

    for (key, value) in metadata {
        if key.is_empty() || key.len() > MAX_CUSTOM_METADATA_KEY_LEN {
            return Err(AppError::InvalidInput(format!(
                "Custom metadata key '{}' must be between 1 and {} characters",
                key, MAX_CUSTOM_METADATA_KEY_LEN
            )));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(AppError::InvalidInput(format!(
                "Custom metadata key '{}' contains invalid characters",
                key
            )));
        }
        if value.len() > MAX_CUSTOM_METADATA_VALUE_LEN {
            return Err(AppError::InvalidInput(format!(
                "Custom metadata value for '{}' exceeds {} characters",
                key, MAX_CUSTOM_METADATA_VALUE_LEN
            )));
        }
    }

    Ok(())
}
