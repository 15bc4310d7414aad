//! Aggregate ticket statistics.
//!
//! Counts are computed from a point-in-time listing; nothing here is cached
//! or incremental. BTreeMaps keep the groupings deterministically ordered
//! for display and for snapshot-style assertions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use vulnboard_authorization::PermissionEvaluator;

use crate::error::Result;
use crate::permissions::{actions, TICKETS_CATEGORY};
use crate::ticket::TicketStore;
use crate::types::Actor;

/// A point-in-time summary of the ticket population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    /// Total number of tickets.
    pub total: usize,
    /// Counts keyed by display status ("Open", "In Progress", ...).
    pub by_status: BTreeMap<String, usize>,
    /// Counts keyed by affected feature.
    pub by_feature: BTreeMap<String, usize>,
    /// Counts of currently accepted tickets keyed by acceptor username.
    pub by_acceptor: BTreeMap<String, usize>,
}

/// Computes ticket statistics behind the view permission gate.
pub struct TicketStatsService {
    evaluator: Arc<PermissionEvaluator>,
    tickets: Arc<dyn TicketStore>,
}

impl TicketStatsService {
    /// Create the service.
    pub fn new(evaluator: Arc<PermissionEvaluator>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { evaluator, tickets }
    }

    /// Compute the summary. Requires read access to tickets.
    pub async fn summary(&self, actor: &Actor) -> Result<TicketStats> {
        self.evaluator
            .authorize_read(&actor.role, TICKETS_CATEGORY, actions::VIEW)
            .await?;

        let tickets = self.tickets.list().await?;
        let mut stats = TicketStats {
            total: tickets.len(),
            ..TicketStats::default()
        };
        for ticket in &tickets {
            *stats
                .by_status
                .entry(ticket.status().to_string())
                .or_default() += 1;
            *stats.by_feature.entry(ticket.feature.clone()).or_default() += 1;
            if let Some(acceptor) = &ticket.accepted_by {
                *stats
                    .by_acceptor
                    .entry(acceptor.username.clone())
                    .or_default() += 1;
            }
        }
        Ok(stats)
    }
}
