//! Role-based authorization core for the vulnboard platform.
//!
//! This crate provides the role catalog, the permission matrix, and the
//! single permission-evaluation seam the rest of the platform calls through:
//!
//! - [`roles::RoleCatalog`] - ordered roles with a total rank
//! - [`matrix::PermissionStore`] - (category, action, role) -> access level,
//!   fail-closed, with [`matrix::InMemoryPermissionStore`] for testing
//! - [`evaluator::PermissionEvaluator`] - evaluation plus caller-policy
//!   helpers (`authorize_mutation` / `authorize_read`) and admin-gated
//!   matrix administration
//!
//! The crate performs no authentication: callers hand it a verified role
//! name and it answers what that role may do.

pub mod error;
pub mod evaluator;
pub mod matrix;
pub mod roles;

pub use error::{AuthorizationError, Result};
pub use evaluator::PermissionEvaluator;
pub use matrix::{
    AccessLevel, ApprovalTier, InMemoryPermissionStore, PermissionEntry, PermissionStore,
};
pub use roles::{Role, RoleCatalog};
