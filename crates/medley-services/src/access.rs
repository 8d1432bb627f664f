//! Asset access policy.
//!
//! Evaluated by every reading and mutating operation: the owner always has
//! access; organization-level and public assets are viewable/downloadable by
//! same-organization actors; edit and delete stay owner-only; private assets
//! are owner-only for everything.

use uuid::Uuid;

use medley_core::models::asset::{AccessLevel, Asset};

/// The authenticated principal performing an operation. Token issuance and
/// verification are external; the core receives the resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

/// Granularity at which the policy is re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAction {
    View,
    Edit,
    Download,
    Delete,
}

/// Whether `actor` may perform `action` on `asset`.
pub fn can_access(asset: &Asset, actor: &Actor, action: AssetAction) -> bool {
    if asset.uploaded_by == actor.user_id {
        return true;
    }
    // Organization boundary holds for everything below.
    if asset.organization_id != actor.organization_id {
        return false;
    }
    match action {
        AssetAction::View | AssetAction::Download => matches!(
            asset.access_level,
            AccessLevel::Organization | AccessLevel::Public
        ),
        AssetAction::Edit | AssetAction::Delete => false,
    }
}
