//! Separation-of-duties policy and conflict checker.
//!
//! The policy maps a proposed action to the prior actions (by the same actor,
//! on the same ticket) that disqualify it. The checker scans the ticket's
//! activity history and consults the org policy for the enforcement mode.
//! A check never mutates state; an `Allowed` result is advisory metadata.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::services::policy::OrgPolicyStore;
use crate::ticket::Ticket;
use crate::types::{ActivityAction, Actor, SodEnforcement};

/// SoD conflict rules: proposed action -> conflicting prior actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SodPolicy {
    conflicts: HashMap<ActivityAction, Vec<ActivityAction>>,
}

impl SodPolicy {
    /// An empty policy with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            conflicts: HashMap::new(),
        }
    }

    /// The default deployment rules: an actor may not accept their own
    /// creation, and may not archive a ticket they resolved.
    #[must_use]
    pub fn default_rules() -> Self {
        let mut policy = Self::empty();
        policy.add_rule(ActivityAction::Accepted, vec![ActivityAction::Created]);
        policy.add_rule(ActivityAction::Archived, vec![ActivityAction::Resolved]);
        policy
    }

    /// Set the conflict list for a proposed action, replacing any existing
    /// rule.
    pub fn add_rule(&mut self, proposed: ActivityAction, conflicts: Vec<ActivityAction>) {
        self.conflicts.insert(proposed, conflicts);
    }

    /// Remove the rule for a proposed action.
    pub fn remove_rule(&mut self, proposed: ActivityAction) {
        self.conflicts.remove(&proposed);
    }

    /// The conflicting prior actions for a proposed action, if any rule exists.
    #[must_use]
    pub fn conflicts_for(&self, proposed: ActivityAction) -> Option<&[ActivityAction]> {
        self.conflicts.get(&proposed).map(Vec::as_slice)
    }
}

impl Default for SodPolicy {
    fn default() -> Self {
        Self::default_rules()
    }
}

/// Outcome of an SoD conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SodDecision {
    /// No disqualifying history.
    Allowed,
    /// The actor has a conflicting prior action on this ticket.
    Denied {
        /// The prior action that conflicts.
        conflicting_action: ActivityAction,
        /// Enforcement mode at decision time.
        enforcement: SodEnforcement,
    },
}

/// An explicit, separately authorized bypass of a soft SoD denial.
///
/// The approver must hold manager rank or higher; the grant is validated by
/// the state machine, which records a [`crate::services::overrides::SodOverride`]
/// once the overridden transition commits.
#[derive(Debug, Clone)]
pub struct OverrideGrant {
    /// The higher-privileged actor authorizing the bypass.
    pub approver: Actor,
    /// Optional justification, copied into the override record.
    pub reason: Option<String>,
}

/// Checks proposed ticket actions against the SoD policy.
pub struct SodChecker {
    policy: SodPolicy,
    org_policy: Arc<dyn OrgPolicyStore>,
}

impl SodChecker {
    /// Create a checker.
    pub fn new(policy: SodPolicy, org_policy: Arc<dyn OrgPolicyStore>) -> Self {
        Self { policy, org_policy }
    }

    /// The conflict rules in force.
    #[must_use]
    pub fn policy(&self) -> &SodPolicy {
        &self.policy
    }

    /// Check whether `actor_id` may perform `proposed` on `ticket`.
    ///
    /// Reads the org policy fresh on every call: the enforcement mode in the
    /// decision is the one committed at check time, and the
    /// `creator_reacceptance` flag can relax `Created` conflicts after a
    /// reassignment (see below).
    pub async fn check(
        &self,
        ticket: &Ticket,
        actor_id: uuid::Uuid,
        proposed: ActivityAction,
    ) -> Result<SodDecision> {
        let Some(conflicts) = self.policy.conflicts_for(proposed) else {
            return Ok(SodDecision::Allowed);
        };

        let org = self.org_policy.get().await?;

        let conflict = ticket.activity.iter().enumerate().find(|(idx, entry)| {
            if entry.actor.id != actor_id || !conflicts.contains(&entry.action) {
                return false;
            }
            // Reassignment churn re-opens the ticket to its creator when the
            // org allows it: a Created entry stops conflicting once a later
            // Reassigned entry exists.
            if org.creator_reacceptance && entry.action == ActivityAction::Created {
                let reassigned_later = ticket
                    .activity
                    .iter()
                    .skip(idx + 1)
                    .any(|later| later.action == ActivityAction::Reassigned);
                if reassigned_later {
                    return false;
                }
            }
            true
        });

        match conflict {
            None => Ok(SodDecision::Allowed),
            Some((_, entry)) => {
                debug!(
                    ticket = %ticket.id,
                    actor = %actor_id,
                    proposed = %proposed,
                    conflicting = %entry.action,
                    enforcement = %org.sod_enforcement,
                    "SoD conflict detected"
                );
                Ok(SodDecision::Denied {
                    conflicting_action: entry.action,
                    enforcement: org.sod_enforcement,
                })
            }
        }
    }
}
