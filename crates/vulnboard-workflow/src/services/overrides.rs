//! Append-only log of exercised SoD overrides.
//!
//! A record is written only when a soft SoD denial is deliberately bypassed
//! by a sufficiently privileged actor. Records are immutable once written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{ActivityAction, OverrideId, TicketId, UserRef};

/// An exercised override of a soft SoD block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SodOverride {
    /// Unique identifier.
    pub id: OverrideId,
    /// The ticket the blocked action was attempted on.
    pub ticket_id: TicketId,
    /// The actor whose action was blocked.
    pub blocked_actor: UserRef,
    /// The action that was blocked.
    pub blocked_action: ActivityAction,
    /// The higher-privileged actor who authorized the bypass.
    pub overridden_by: UserRef,
    /// Optional justification.
    pub reason: Option<String>,
    /// When the override was exercised.
    pub timestamp: DateTime<Utc>,
}

/// Input for recording an override.
#[derive(Debug, Clone)]
pub struct SodOverrideInput {
    /// The ticket the blocked action was attempted on.
    pub ticket_id: TicketId,
    /// The actor whose action was blocked.
    pub blocked_actor: UserRef,
    /// The action that was blocked.
    pub blocked_action: ActivityAction,
    /// The actor who authorized the bypass.
    pub overridden_by: UserRef,
    /// Optional justification.
    pub reason: Option<String>,
}

/// Trait for override log storage backends. Append-only: there is no update
/// or delete.
#[async_trait::async_trait]
pub trait OverrideStore: Send + Sync {
    /// Record an exercised override.
    async fn record(&self, input: SodOverrideInput) -> Result<SodOverride>;

    /// List overrides for a ticket, oldest first.
    async fn list_for_ticket(&self, ticket_id: TicketId) -> Result<Vec<SodOverride>>;
}

/// In-memory override store for testing.
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    records: Arc<RwLock<Vec<SodOverride>>>,
}

impl InMemoryOverrideStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record count.
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait::async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn record(&self, input: SodOverrideInput) -> Result<SodOverride> {
        let record = SodOverride {
            id: OverrideId::new(),
            ticket_id: input.ticket_id,
            blocked_actor: input.blocked_actor,
            blocked_action: input.blocked_action,
            overridden_by: input.overridden_by,
            reason: input.reason,
            timestamp: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_for_ticket(&self, ticket_id: TicketId) -> Result<Vec<SodOverride>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}
