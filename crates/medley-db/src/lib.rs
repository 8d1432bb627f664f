//! Medley Asset Repository
//!
//! The durable document store for assets is an external collaborator. This
//! crate defines the `AssetRepository` trait the rest of the system consumes,
//! together with the filter/patch/analytics types of that interface, and an
//! in-memory implementation used by tests and single-node deployments.

pub mod memory;
pub mod repository;

pub use memory::InMemoryAssetRepository;
pub use repository::{AssetAnalytics, AssetFilter, AssetPatch, AssetRepository, SortOrder};
