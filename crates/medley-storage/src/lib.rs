//! Medley Storage Gateway
//!
//! The object store is an external collaborator that owns no business logic.
//! This crate defines the `StorageGateway` trait the pipeline consumes —
//! presigned upload/download URLs, existence checks, deletes, and the byte
//! paths the workers use — plus the deterministic storage key addressing
//! scheme, an S3 implementation, and an in-memory implementation.
//!
//! # Storage key format
//!
//! Keys are organization-scoped and parse back into their component ids:
//!
//! - Originals: `org/{org}/proj/{project}/asset/{asset}/original/v{version}/{filename}`
//! - Renditions: `org/{org}/proj/{project}/asset/{asset}/renditions/{name}/{filename}`
//!
//! Key generation and parsing are centralized in the `keys` module so every
//! backend and every audit/cleanup path stays consistent.

pub mod factory;
pub mod keys;
pub mod memory;
pub mod s3;
pub mod traits;

pub use factory::create_storage_gateway;
pub use keys::{
    original_key, parse_storage_key, rendition_key, sanitize_filename, KeyKind, ParsedStorageKey,
};
pub use memory::InMemoryGateway;
pub use s3::S3Gateway;
pub use traits::{ObjectInfo, PresignedUrl, StorageError, StorageGateway, StorageResult};
