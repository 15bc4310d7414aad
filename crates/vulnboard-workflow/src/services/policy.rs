//! Organization-wide workflow policy.
//!
//! The policy is a singleton read on every SoD decision. Reads always go to
//! the store; an enforcement-mode change must take effect on the very next
//! request, so nothing here caches.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use vulnboard_authorization::RoleCatalog;

use crate::error::{DenyReason, Result, WorkflowError};
use crate::types::{Actor, SodEnforcement};

/// Organization-wide workflow policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrgPolicy {
    /// How SoD conflicts are enforced.
    pub sod_enforcement: SodEnforcement,
    /// Whether a ticket's creator may re-enter the workflow (resolve/archive/
    /// accept) after a reassignment. When false, a `Created` entry conflicts
    /// permanently wherever a rule names it.
    pub creator_reacceptance: bool,
}

/// Trait for org policy storage backends.
#[async_trait::async_trait]
pub trait OrgPolicyStore: Send + Sync {
    /// Read the current policy.
    async fn get(&self) -> Result<OrgPolicy>;

    /// Replace the policy.
    async fn set(&self, policy: OrgPolicy) -> Result<()>;
}

/// In-memory org policy store for testing.
#[derive(Debug, Default)]
pub struct InMemoryOrgPolicyStore {
    policy: Arc<RwLock<OrgPolicy>>,
}

impl InMemoryOrgPolicyStore {
    /// Create a store holding the default policy (hard enforcement).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given policy.
    #[must_use]
    pub fn with_policy(policy: OrgPolicy) -> Self {
        Self {
            policy: Arc::new(RwLock::new(policy)),
        }
    }
}

#[async_trait::async_trait]
impl OrgPolicyStore for InMemoryOrgPolicyStore {
    async fn get(&self) -> Result<OrgPolicy> {
        Ok(*self.policy.read().await)
    }

    async fn set(&self, policy: OrgPolicy) -> Result<()> {
        *self.policy.write().await = policy;
        Ok(())
    }
}

/// Admin-gated access to the org policy.
pub struct OrgPolicyService {
    store: Arc<dyn OrgPolicyStore>,
    catalog: RoleCatalog,
}

impl OrgPolicyService {
    /// Create the service.
    pub fn new(store: Arc<dyn OrgPolicyStore>, catalog: RoleCatalog) -> Self {
        Self { store, catalog }
    }

    /// Read the current policy. Open to any caller; the policy itself is not
    /// sensitive, only its mutation is.
    pub async fn get(&self) -> Result<OrgPolicy> {
        self.store.get().await
    }

    /// Replace the policy. Admin rank required.
    pub async fn update(&self, actor: &Actor, policy: OrgPolicy) -> Result<OrgPolicy> {
        if !self.catalog.at_least(&actor.role, "admin") {
            return Err(WorkflowError::PermissionDenied(DenyReason::RoleBlocked));
        }
        let previous = self.store.get().await?;
        self.store.set(policy).await?;
        info!(
            actor = %actor.username,
            old_enforcement = %previous.sod_enforcement,
            new_enforcement = %policy.sod_enforcement,
            "org policy updated"
        );
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), "root", "admin")
    }

    fn manager() -> Actor {
        Actor::new(Uuid::new_v4(), "meg", "manager")
    }

    fn service() -> OrgPolicyService {
        OrgPolicyService::new(
            Arc::new(InMemoryOrgPolicyStore::new()),
            RoleCatalog::default_catalog(),
        )
    }

    #[tokio::test]
    async fn test_default_policy_is_hard() {
        let service = service();
        let policy = service.get().await.unwrap();
        assert_eq!(policy.sod_enforcement, SodEnforcement::Hard);
        assert!(!policy.creator_reacceptance);
    }

    #[tokio::test]
    async fn test_update_requires_admin() {
        let service = service();
        let soft = OrgPolicy {
            sod_enforcement: SodEnforcement::Soft,
            creator_reacceptance: false,
        };

        let err = service.update(&manager(), soft).await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::PermissionDenied(DenyReason::RoleBlocked)
        );
        assert_eq!(
            service.get().await.unwrap().sod_enforcement,
            SodEnforcement::Hard
        );
    }

    #[tokio::test]
    async fn test_update_is_visible_immediately() {
        let service = service();
        let soft = OrgPolicy {
            sod_enforcement: SodEnforcement::Soft,
            creator_reacceptance: true,
        };

        service.update(&admin(), soft).await.unwrap();
        assert_eq!(service.get().await.unwrap(), soft);
    }
}
