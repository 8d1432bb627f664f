//! Medley Services
//!
//! The asset lifecycle service (the single API-side writer of status
//! transitions), the job dispatcher, and the access policy. The routing
//! layer in front of these services is an external collaborator; everything
//! here is callable directly and tested without HTTP.

pub mod access;
pub mod dispatcher;
pub mod lifecycle;

pub use access::{can_access, Actor, AssetAction};
pub use dispatcher::JobDispatcher;
pub use lifecycle::AssetLifecycleService;
