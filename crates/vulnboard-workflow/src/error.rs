//! Error types for the ticket-workflow core.
//!
//! The taxonomy keeps gate failures distinguishable: a role block, a missing
//! ownership, a pending approval, and an SoD conflict are all different
//! variants so callers can react differently to each.

use thiserror::Error;

use vulnboard_authorization::{ApprovalTier, AuthorizationError};

use crate::types::{ActivityAction, SodEnforcement};

/// Why a permission gate denied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    /// The role's matrix entry blocks the action outright.
    #[error("role is blocked for this action")]
    RoleBlocked,
    /// The action is reserved for the ticket's current acceptor.
    #[error("only the current acceptor may perform this action")]
    OwnershipRequired,
    /// The action must be held for sign-off by the named tier.
    #[error("requires {0} approval")]
    ApprovalRequired(ApprovalTier),
}

/// Errors that can occur during ticket-workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// A ticket, comment, or user reference did not resolve.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        resource: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The permission gate denied the request; the reason names which check
    /// failed.
    #[error("permission denied: {0}")]
    PermissionDenied(DenyReason),

    /// The actor has a disqualifying prior action on this ticket.
    ///
    /// Under [`SodEnforcement::Soft`] the caller may retry with an explicit
    /// override grant; under hard enforcement this is final.
    #[error("SoD conflict: {action} conflicts with prior {conflicting_action} ({enforcement} enforcement)")]
    SodConflict {
        /// The proposed action.
        action: ActivityAction,
        /// The prior action by the same actor that conflicts with it.
        conflicting_action: ActivityAction,
        /// Enforcement mode at decision time.
        enforcement: SodEnforcement,
    },

    /// An override was attempted but is not permitted (hard enforcement, or
    /// the approver lacks manager rank).
    #[error("SoD override not permitted: {0}")]
    OverrideNotPermitted(String),

    /// The transition is illegal in the ticket's current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A storage backend error, propagated opaquely. Transitions are atomic
    /// at the store, so no partial state survives this.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<AuthorizationError> for WorkflowError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::RoleBlocked { .. } => {
                Self::PermissionDenied(DenyReason::RoleBlocked)
            }
            AuthorizationError::ApprovalRequired { tier, .. } => {
                Self::PermissionDenied(DenyReason::ApprovalRequired(tier))
            }
            // Fail closed: an unknown role or a missing admin rank is a block.
            AuthorizationError::UnknownRole(_) | AuthorizationError::AdminRequired => {
                Self::PermissionDenied(DenyReason::RoleBlocked)
            }
            AuthorizationError::InvalidCatalog(msg) => Self::Storage(msg),
            AuthorizationError::Storage(msg) => Self::Storage(msg),
        }
    }
}

/// Convenience Result type for the ticket-workflow core.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_error_maps_to_structured_denial() {
        let err = AuthorizationError::ApprovalRequired {
            category: "tickets".into(),
            action: "delete tickets".into(),
            tier: ApprovalTier::Admin,
        };
        let mapped = WorkflowError::from(err);
        assert_eq!(
            mapped,
            WorkflowError::PermissionDenied(DenyReason::ApprovalRequired(ApprovalTier::Admin))
        );
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        let mapped = WorkflowError::from(AuthorizationError::UnknownRole("ghost".into()));
        assert_eq!(
            mapped,
            WorkflowError::PermissionDenied(DenyReason::RoleBlocked)
        );
    }

    #[test]
    fn test_sod_conflict_display_names_both_actions() {
        let err = WorkflowError::SodConflict {
            action: ActivityAction::Accepted,
            conflicting_action: ActivityAction::Created,
            enforcement: SodEnforcement::Soft,
        };
        let text = err.to_string();
        assert!(text.contains("Accepted"));
        assert!(text.contains("Created"));
        assert!(text.contains("soft"));
    }
}
