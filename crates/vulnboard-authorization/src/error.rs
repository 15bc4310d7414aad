//! Error types for the authorization core.

use thiserror::Error;

use crate::matrix::ApprovalTier;

/// Errors that can occur during permission evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The role is not permitted to attempt this action at all.
    #[error("Role is blocked for {category}/{action}")]
    RoleBlocked {
        /// Permission category that was checked.
        category: String,
        /// Action within the category.
        action: String,
    },

    /// The action may not be applied directly; it requires approval first.
    #[error("Action {category}/{action} requires {tier} approval")]
    ApprovalRequired {
        /// Permission category that was checked.
        category: String,
        /// Action within the category.
        action: String,
        /// The approval tier that must sign off.
        tier: ApprovalTier,
    },

    /// A role name not present in the role catalog.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// The caller must hold admin rank for this operation.
    #[error("Admin rank required")]
    AdminRequired,

    /// Role catalog construction failed (ranks must strictly increase).
    #[error("Invalid role catalog: {0}")]
    InvalidCatalog(String),

    /// A storage backend error, propagated opaquely.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Convenience Result type for the authorization core.
pub type Result<T> = std::result::Result<T, AuthorizationError>;
