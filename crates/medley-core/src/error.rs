//! Error types module
//!
//! All synchronous failure modes of the asset pipeline are unified under the
//! `AppError` enum: validation, conflict, integrity, access, not-found, and
//! infrastructure errors. Processing errors raised inside workers are never
//! surfaced through this type to a caller; they are recorded on the asset
//! itself (`status = failed`, truncated `processing_error`).

use crate::models::asset::AssetStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics
/// to the (external) routing layer.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DUPLICATE_ASSET")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extension of '{filename}' is inconsistent with content type '{content_type}'")]
    InvalidExtension {
        filename: String,
        content_type: String,
    },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: i64, limit: i64 },

    #[error("An asset with checksum '{checksum}' already exists in this organization")]
    DuplicateAsset { checksum: String },

    #[error("Invalid asset status: {operation} requires {required}, asset is {current}")]
    InvalidStatus {
        operation: &'static str,
        required: AssetStatus,
        current: AssetStatus,
    },

    #[error("Checksum mismatch: declared {declared}, actual {actual}")]
    ChecksumMismatch { declared: String, actual: String },

    #[error("Size mismatch: declared {declared} bytes, actual {actual} bytes")]
    SizeMismatch { declared: i64, actual: i64 },

    #[error("Uploaded object not found in storage at key '{0}'")]
    ObjectMissing(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata per variant: (http_status, error_code, recoverable, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Repository(_) => (500, "REPOSITORY_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, LogLevel::Error),
        AppError::Queue(_) => (500, "QUEUE_ERROR", true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::InvalidExtension { .. } => (400, "INVALID_EXTENSION", false, LogLevel::Debug),
        AppError::PayloadTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::DuplicateAsset { .. } => (409, "DUPLICATE_ASSET", false, LogLevel::Debug),
        AppError::InvalidStatus { .. } => (409, "INVALID_STATUS", false, LogLevel::Debug),
        AppError::ChecksumMismatch { .. } => (422, "CHECKSUM_MISMATCH", false, LogLevel::Warn),
        AppError::SizeMismatch { .. } => (422, "SIZE_MISMATCH", false, LogLevel::Warn),
        AppError::ObjectMissing(_) => (422, "OBJECT_MISSING", false, LogLevel::Warn),
        AppError::AccessDenied(_) => (403, "ACCESS_DENIED", false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Repository(_) => "Repository",
            AppError::Storage(_) => "Storage",
            AppError::Queue(_) => "Queue",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidExtension { .. } => "InvalidExtension",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::DuplicateAsset { .. } => "DuplicateAsset",
            AppError::InvalidStatus { .. } => "InvalidStatus",
            AppError::ChecksumMismatch { .. } => "ChecksumMismatch",
            AppError::SizeMismatch { .. } => "SizeMismatch",
            AppError::ObjectMissing(_) => "ObjectMissing",
            AppError::AccessDenied(_) => "AccessDenied",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Repository(_) => "Failed to access asset store".to_string(),
            AppError::Storage(_) => "Failed to access object storage".to_string(),
            AppError::Queue(_) => "Failed to access job queue".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}
