//! Deterministic, human-auditable storage key addressing.
//!
//! Key generation and parsing are a round-trip contract: every key built here
//! parses back into its component ids, which audits and cleanup rely on.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};
use medley_core::constants::MAX_KEY_FILENAME_LEN;

/// What a storage key addresses: an original version or a named rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    Original { version: i32 },
    Rendition { name: String },
}

/// A storage key decomposed into its component ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStorageKey {
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub asset_id: Uuid,
    pub kind: KeyKind,
    pub filename: String,
}

/// Sanitize a filename for embedding in a storage key: restrict to
/// `[A-Za-z0-9._-]`, collapse runs of replacements and dots (no `..` may
/// survive into a key), and cap the length while preserving the extension.
pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized = String::with_capacity(filename.len());
    let mut last_was_replacement = false;
    for c in filename.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
            sanitized.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            sanitized.push('_');
            last_was_replacement = true;
        }
    }

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", ".");
    }

    let sanitized = sanitized
        .trim_matches(|c| c == '_' || c == '.')
        .to_string();
    if sanitized.is_empty() {
        return "file".to_string();
    }

    if sanitized.len() <= MAX_KEY_FILENAME_LEN {
        return sanitized;
    }

    // Over the cap: keep the extension, truncate the stem.
    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_KEY_FILENAME_LEN => {
            let keep = MAX_KEY_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..stem.len().min(keep)], ext)
        }
        _ => sanitized[..MAX_KEY_FILENAME_LEN].to_string(),
    }
}

/// Key for an original content version.
pub fn original_key(
    organization_id: Uuid,
    project_id: Uuid,
    asset_id: Uuid,
    version: i32,
    filename: &str,
) -> String {
    format!(
        "org/{}/proj/{}/asset/{}/original/v{}/{}",
        organization_id,
        project_id,
        asset_id,
        version,
        sanitize_filename(filename)
    )
}

/// Key for a derived rendition artifact.
pub fn rendition_key(
    organization_id: Uuid,
    project_id: Uuid,
    asset_id: Uuid,
    rendition_name: &str,
    filename: &str,
) -> String {
    format!(
        "org/{}/proj/{}/asset/{}/renditions/{}/{}",
        organization_id,
        project_id,
        asset_id,
        rendition_name,
        sanitize_filename(filename)
    )
}

/// Parse a storage key back into its component ids.
pub fn parse_storage_key(key: &str) -> StorageResult<ParsedStorageKey> {
    let invalid = |reason: &str| StorageError::InvalidKey(format!("{}: '{}'", reason, key));

    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() != 9 {
        return Err(invalid("Key must have 9 segments"));
    }
    if parts[0] != "org" || parts[2] != "proj" || parts[4] != "asset" {
        return Err(invalid("Key segments out of order"));
    }

    let organization_id = Uuid::parse_str(parts[1]).map_err(|_| invalid("Bad organization id"))?;
    let project_id = Uuid::parse_str(parts[3]).map_err(|_| invalid("Bad project id"))?;
    let asset_id = Uuid::parse_str(parts[5]).map_err(|_| invalid("Bad asset id"))?;

    let kind = match parts[6] {
        "original" => {
            let version = parts[7]
                .strip_prefix('v')
                .and_then(|v| v.parse::<i32>().ok())
                .filter(|v| *v >= 1)
                .ok_or_else(|| invalid("Bad version segment"))?;
            KeyKind::Original { version }
        }
        "renditions" => {
            if parts[7].is_empty() {
                return Err(invalid("Empty rendition name"));
            }
            KeyKind::Rendition {
                name: parts[7].to_string(),
            }
        }
        _ => return Err(invalid("Unknown key kind")),
    };

    if parts[8].is_empty() {
        return Err(invalid("Empty filename"));
    }

    Ok(ParsedStorageKey {
        organization_id,
        project_id,
        asset_id,
        kind,
        filename: parts[8].to_string(),
    })
}
