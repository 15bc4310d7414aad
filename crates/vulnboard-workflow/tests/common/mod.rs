//! Common test utilities for vulnboard-workflow integration tests.
//!
//! All tests run against in-memory stores for isolation and speed; the
//! context wires the full service stack the way a deployment would.

use std::sync::Arc;

use uuid::Uuid;
use vulnboard_authorization::{InMemoryPermissionStore, PermissionEvaluator, RoleCatalog};
use vulnboard_workflow::directory::InMemoryUserDirectory;
use vulnboard_workflow::permissions::default_ticket_entries;
use vulnboard_workflow::services::{
    InMemoryOrgPolicyStore, InMemoryOverrideStore, OrgPolicy, OrgPolicyService, SodChecker,
    SodPolicy, TicketService, TicketStatsService,
};
use vulnboard_workflow::ticket::InMemoryTicketStore;
use vulnboard_workflow::types::{Actor, SodEnforcement, UserRef};

/// The full service stack over isolated in-memory stores.
pub struct TestContext {
    pub tickets: TicketService,
    pub policy: OrgPolicyService,
    pub stats: TicketStatsService,
    pub overrides: Arc<InMemoryOverrideStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub admin: Actor,
}

impl TestContext {
    /// Wire the stack with the default role catalog, the default ticket
    /// permission matrix, and the default SoD rules (hard enforcement).
    pub async fn new() -> Self {
        let catalog = RoleCatalog::default_catalog();
        let permissions =
            Arc::new(InMemoryPermissionStore::seeded(default_ticket_entries()).await);
        let evaluator = Arc::new(PermissionEvaluator::new(catalog.clone(), permissions));

        let ticket_store = Arc::new(InMemoryTicketStore::new());
        let org_policy = Arc::new(InMemoryOrgPolicyStore::new());
        let overrides = Arc::new(InMemoryOverrideStore::new());
        let directory = Arc::new(InMemoryUserDirectory::new());

        let tickets = TicketService::new(
            evaluator.clone(),
            ticket_store.clone(),
            SodChecker::new(SodPolicy::default_rules(), org_policy.clone()),
            overrides.clone(),
            directory.clone(),
        );
        let policy = OrgPolicyService::new(org_policy, catalog);
        let stats = TicketStatsService::new(evaluator, ticket_store);

        Self {
            tickets,
            policy,
            stats,
            overrides,
            directory,
            admin: Actor::new(Uuid::new_v4(), "root", "admin"),
        }
    }

    /// Register a user in the mention directory and return a matching actor.
    pub async fn user(&self, username: &str, role: &str) -> Actor {
        let actor = Actor::new(Uuid::new_v4(), username, role);
        self.directory
            .insert(UserRef::new(actor.id, username))
            .await;
        actor
    }

    /// Switch the org to soft SoD enforcement.
    pub async fn soften_enforcement(&self) {
        self.policy
            .update(
                &self.admin,
                OrgPolicy {
                    sod_enforcement: SodEnforcement::Soft,
                    creator_reacceptance: false,
                },
            )
            .await
            .expect("admin policy update should succeed");
    }
}
