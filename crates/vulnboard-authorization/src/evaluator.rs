//! Permission evaluator: the single capability-check seam.
//!
//! All role/permission decisions in the system go through
//! [`PermissionEvaluator::evaluate`]; callers never re-implement matrix
//! lookups inline.

use std::sync::Arc;

use tracing::debug;

use crate::error::{AuthorizationError, Result};
use crate::matrix::{AccessLevel, ApprovalTier, PermissionEntry, PermissionStore};
use crate::roles::RoleCatalog;

/// Evaluates (role, category, action) against the permission matrix.
pub struct PermissionEvaluator {
    catalog: RoleCatalog,
    store: Arc<dyn PermissionStore>,
}

impl PermissionEvaluator {
    /// Create an evaluator over a catalog and a matrix store.
    pub fn new(catalog: RoleCatalog, store: Arc<dyn PermissionStore>) -> Self {
        Self { catalog, store }
    }

    /// The role catalog this evaluator compares ranks against.
    #[must_use]
    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Look up the access level for a role on (category, action).
    ///
    /// Fail-closed: an unknown role name or a missing matrix entry both
    /// evaluate to [`AccessLevel::Blocked`], never an error. No side effects.
    pub async fn evaluate(&self, role: &str, category: &str, action: &str) -> Result<AccessLevel> {
        if !self.catalog.contains(role) {
            debug!(role, category, action, "unknown role, evaluating as blocked");
            return Ok(AccessLevel::Blocked);
        }
        let level = self
            .store
            .get(category, action, role)
            .await?
            .unwrap_or(AccessLevel::Blocked);
        debug!(role, category, action, %level, "permission evaluated");
        Ok(level)
    }

    /// Gate a mutating request.
    ///
    /// `ReadWrite` passes. `Blocked` and `ReadOnly` fail with
    /// [`AuthorizationError::RoleBlocked`]. Approval levels fail with
    /// [`AuthorizationError::ApprovalRequired`] naming the tier; the caller
    /// must hold the mutation for sign-off, never downgrade it.
    pub async fn authorize_mutation(&self, role: &str, category: &str, action: &str) -> Result<()> {
        match self.evaluate(role, category, action).await? {
            AccessLevel::ReadWrite => Ok(()),
            AccessLevel::ManagerApproval => Err(AuthorizationError::ApprovalRequired {
                category: category.to_string(),
                action: action.to_string(),
                tier: ApprovalTier::Manager,
            }),
            AccessLevel::AdminApproval => Err(AuthorizationError::ApprovalRequired {
                category: category.to_string(),
                action: action.to_string(),
                tier: ApprovalTier::Admin,
            }),
            AccessLevel::Blocked | AccessLevel::ReadOnly => Err(AuthorizationError::RoleBlocked {
                category: category.to_string(),
                action: action.to_string(),
            }),
        }
    }

    /// Gate a non-mutating read. `ReadOnly` or better passes.
    pub async fn authorize_read(&self, role: &str, category: &str, action: &str) -> Result<()> {
        let level = self.evaluate(role, category, action).await?;
        if level.allows_read() {
            Ok(())
        } else {
            Err(AuthorizationError::RoleBlocked {
                category: category.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// Insert or replace a matrix entry. Admin rank required.
    pub async fn set_entry(&self, actor_role: &str, entry: PermissionEntry) -> Result<()> {
        self.require_admin(actor_role)?;
        if !self.catalog.contains(&entry.role) {
            return Err(AuthorizationError::UnknownRole(entry.role));
        }
        self.store.set(entry).await
    }

    /// Remove a matrix entry. Admin rank required. The triple falls back to
    /// blocked once removed.
    pub async fn remove_entry(
        &self,
        actor_role: &str,
        category: &str,
        action: &str,
        role: &str,
    ) -> Result<bool> {
        self.require_admin(actor_role)?;
        self.store.remove(category, action, role).await
    }

    /// List all matrix entries. Admin rank required.
    pub async fn list_entries(&self, actor_role: &str) -> Result<Vec<PermissionEntry>> {
        self.require_admin(actor_role)?;
        self.store.list().await
    }

    fn require_admin(&self, role: &str) -> Result<()> {
        if self.catalog.at_least(role, "admin") {
            Ok(())
        } else {
            Err(AuthorizationError::AdminRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::InMemoryPermissionStore;

    async fn evaluator_with(entries: Vec<PermissionEntry>) -> PermissionEvaluator {
        let store = Arc::new(InMemoryPermissionStore::seeded(entries).await);
        PermissionEvaluator::new(RoleCatalog::default_catalog(), store)
    }

    #[tokio::test]
    async fn test_missing_entry_is_blocked() {
        let evaluator = evaluator_with(vec![]).await;
        let level = evaluator
            .evaluate("analyst", "tickets", "accept tickets")
            .await
            .unwrap();
        assert_eq!(level, AccessLevel::Blocked);
    }

    #[tokio::test]
    async fn test_unknown_role_is_blocked_even_with_entry() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "accept tickets",
            "superuser",
            AccessLevel::ReadWrite,
        )])
        .await;
        // The entry names a role outside the catalog; evaluation stays closed.
        let level = evaluator
            .evaluate("superuser", "tickets", "accept tickets")
            .await
            .unwrap();
        assert_eq!(level, AccessLevel::Blocked);
    }

    #[tokio::test]
    async fn test_authorize_mutation_read_write_passes() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "accept tickets",
            "analyst",
            AccessLevel::ReadWrite,
        )])
        .await;
        assert!(evaluator
            .authorize_mutation("analyst", "tickets", "accept tickets")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_authorize_mutation_read_only_is_blocked() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "view tickets",
            "viewer",
            AccessLevel::ReadOnly,
        )])
        .await;
        let err = evaluator
            .authorize_mutation("viewer", "tickets", "view tickets")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorizationError::RoleBlocked { .. }));
    }

    #[tokio::test]
    async fn test_authorize_mutation_approval_names_tier() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "delete tickets",
            "manager",
            AccessLevel::AdminApproval,
        )])
        .await;
        let err = evaluator
            .authorize_mutation("manager", "tickets", "delete tickets")
            .await
            .unwrap_err();
        match err {
            AuthorizationError::ApprovalRequired { tier, .. } => {
                assert_eq!(tier, crate::matrix::ApprovalTier::Admin);
            }
            other => panic!("expected ApprovalRequired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authorize_read() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "view tickets",
            "viewer",
            AccessLevel::ReadOnly,
        )])
        .await;
        assert!(evaluator
            .authorize_read("viewer", "tickets", "view tickets")
            .await
            .is_ok());
        assert!(evaluator
            .authorize_read("analyst", "tickets", "view tickets")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_set_entry_requires_admin() {
        let evaluator = evaluator_with(vec![]).await;
        let entry = PermissionEntry::new("tickets", "view tickets", "viewer", AccessLevel::ReadOnly);

        let err = evaluator.set_entry("manager", entry.clone()).await.unwrap_err();
        assert_eq!(err, AuthorizationError::AdminRequired);

        evaluator.set_entry("admin", entry).await.unwrap();
        let level = evaluator
            .evaluate("viewer", "tickets", "view tickets")
            .await
            .unwrap();
        assert_eq!(level, AccessLevel::ReadOnly);
    }

    #[tokio::test]
    async fn test_set_entry_rejects_unknown_role() {
        let evaluator = evaluator_with(vec![]).await;
        let entry =
            PermissionEntry::new("tickets", "view tickets", "superuser", AccessLevel::ReadOnly);
        let err = evaluator.set_entry("admin", entry).await.unwrap_err();
        assert!(matches!(err, AuthorizationError::UnknownRole(_)));
    }

    #[tokio::test]
    async fn test_remove_entry_falls_back_to_blocked() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "accept tickets",
            "analyst",
            AccessLevel::ReadWrite,
        )])
        .await;

        let removed = evaluator
            .remove_entry("admin", "tickets", "accept tickets", "analyst")
            .await
            .unwrap();
        assert!(removed);

        let level = evaluator
            .evaluate("analyst", "tickets", "accept tickets")
            .await
            .unwrap();
        assert_eq!(level, AccessLevel::Blocked);
    }

    #[tokio::test]
    async fn test_list_entries_requires_admin() {
        let evaluator = evaluator_with(vec![PermissionEntry::new(
            "tickets",
            "view tickets",
            "viewer",
            AccessLevel::ReadOnly,
        )])
        .await;

        assert!(evaluator.list_entries("analyst").await.is_err());
        let entries = evaluator.list_entries("admin").await.unwrap();
        assert_eq!(entries.len(), 1);
    }
}
