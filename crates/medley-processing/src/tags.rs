//! Suggested-tag generation from filename tokens and extracted metadata.

use medley_core::constants::MAX_SUGGESTED_TAGS;
use medley_core::models::asset::TechnicalMetadata;

const MIN_TOKEN_LEN: usize = 4;

const HIGH_QUALITY_BITRATE: u64 = 5_000_000;
const SHORT_DURATION_SECS: f64 = 30.0;
const LONG_DURATION_SECS: f64 = 300.0;

/// Tokens too generic to be useful tags.
const STOPWORDS: &[&str] = &[
    "file", "copy", "final", "draft", "image", "video", "audio", "photo", "untitled", "with",
    "from", "this", "that", "document", "export", "download",
];

/// Generate up to ten suggested tags for an asset: filename tokens, format,
/// orientation, duration buckets, and a bitrate threshold. Callers decide how
/// many of the suggestions to apply.
pub fn suggest_tags(filename: &str, metadata: &TechnicalMetadata) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tag.is_empty() && !tags.contains(&tag) && tags.len() < MAX_SUGGESTED_TAGS {
            tags.push(tag);
        }
    };

    // Filename tokens, extension excluded.
    let stem = filename.rsplit_once('.').map_or(filename, |(s, _)| s);
    for token in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
        let token = token.to_ascii_lowercase();
        if token.len() >= MIN_TOKEN_LEN
            && !STOPWORDS.contains(&token.as_str())
            && !token.chars().all(|c| c.is_ascii_digit())
        {
            push(token);
        }
    }

    if let Some(ref format) = metadata.format {
        push(format.to_ascii_lowercase());
    }

    if let (Some(width), Some(height)) = (metadata.width, metadata.height) {
        let orientation = if width > height {
            "landscape"
        } else if height > width {
            "portrait"
        } else {
            "square"
        };
        push(orientation.to_string());
    }

    if let Some(duration) = metadata.duration_seconds {
        if duration < SHORT_DURATION_SECS {
            push("short".to_string());
        } else if duration > LONG_DURATION_SECS {
            push("long".to_string());
        }
    }

    if let Some(bitrate) = metadata.bitrate {
        if bitrate > HIGH_QUALITY_BITRATE {
            push("high-quality".to_string());
        }
    }

    tags
}
