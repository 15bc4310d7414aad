//! Ticket lifecycle service: the state machine's front door.
//!
//! Every mutating operation runs the same gauntlet in order: role permission
//! (via the evaluator), ownership where the transition is reserved for the
//! acceptor, SoD conflict check, then the atomic store transition. A
//! per-ticket gate serializes the gauntlet, so the SoD scan and the
//! transition it authorizes form one critical section; the store re-validates
//! state preconditions as a second line of defense.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use vulnboard_authorization::PermissionEvaluator;

use crate::directory::UserDirectory;
use crate::error::{DenyReason, Result, WorkflowError};
use crate::permissions::{actions, TICKETS_CATEGORY};
use crate::services::overrides::{OverrideStore, SodOverrideInput};
use crate::services::sod::{OverrideGrant, SodChecker, SodDecision};
use crate::ticket::{CreateTicketInput, Ticket, TicketStore};
use crate::types::{ActivityAction, Actor, CommentId, SodEnforcement, TicketId};

/// Orchestrates ticket transitions behind permission and SoD gates.
pub struct TicketService {
    evaluator: Arc<PermissionEvaluator>,
    tickets: Arc<dyn TicketStore>,
    sod: SodChecker,
    overrides: Arc<dyn OverrideStore>,
    directory: Arc<dyn UserDirectory>,
    gates: Mutex<HashMap<TicketId, Arc<Mutex<()>>>>,
}

impl TicketService {
    /// Create the service.
    pub fn new(
        evaluator: Arc<PermissionEvaluator>,
        tickets: Arc<dyn TicketStore>,
        sod: SodChecker,
        overrides: Arc<dyn OverrideStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            evaluator,
            tickets,
            sod,
            overrides,
            directory,
            gates: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch a ticket.
    pub async fn get(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        self.evaluator
            .authorize_read(&actor.role, TICKETS_CATEGORY, actions::VIEW)
            .await?;
        self.fetch(id).await
    }

    /// List all tickets.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Ticket>> {
        self.evaluator
            .authorize_read(&actor.role, TICKETS_CATEGORY, actions::VIEW)
            .await?;
        self.tickets.list().await
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// File a new ticket.
    pub async fn create(
        &self,
        actor: &Actor,
        description: impl Into<String>,
        feature: impl Into<String>,
    ) -> Result<Ticket> {
        self.authorize(actor, actions::CREATE).await?;
        self.tickets
            .create(CreateTicketInput {
                creator: actor.user_ref(),
                description: description.into(),
                feature: feature.into(),
            })
            .await
    }

    /// Take responsibility for a ticket.
    pub async fn accept(
        &self,
        actor: &Actor,
        id: TicketId,
        override_grant: Option<OverrideGrant>,
    ) -> Result<Ticket> {
        self.authorize(actor, actions::ACCEPT).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        if ticket.is_accepted() {
            return Err(WorkflowError::InvalidTransition(
                "ticket is already accepted".into(),
            ));
        }
        let pending = self
            .enforce_sod(&ticket, actor, ActivityAction::Accepted, override_grant)
            .await?;
        let ticket = self.tickets.accept(id, &actor.user_ref()).await?;
        self.record_override(pending).await?;
        Ok(ticket)
    }

    /// Comment on a ticket. Only the current acceptor or an existing
    /// collaborator may comment; mentioned users become collaborators.
    pub async fn comment(
        &self,
        actor: &Actor,
        id: TicketId,
        text: impl Into<String>,
    ) -> Result<(Ticket, CommentId)> {
        self.authorize(actor, actions::COMMENT).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        self.require_participant(&ticket, actor)?;

        let text = text.into();
        let mut candidates = Vec::new();
        for username in parse_mentions(&text) {
            // Unknown usernames are skipped silently.
            if let Some(user) = self.directory.lookup(&username).await? {
                candidates.push(user);
            }
        }

        self.tickets
            .add_comment(id, &actor.user_ref(), text, candidates)
            .await
    }

    /// Mark a comment's feedback addressed.
    pub async fn fix_comment(
        &self,
        actor: &Actor,
        id: TicketId,
        comment_id: CommentId,
    ) -> Result<Ticket> {
        self.authorize(actor, actions::FIX_COMMENT).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        self.require_participant(&ticket, actor)?;
        self.tickets
            .fix_comment(id, comment_id, &actor.user_ref())
            .await
    }

    /// Set or clear the resolution. Only the current acceptor may resolve;
    /// `is_resolved = false` is the reopen-via-resolve path.
    pub async fn resolve(
        &self,
        actor: &Actor,
        id: TicketId,
        is_resolved: bool,
        override_grant: Option<OverrideGrant>,
    ) -> Result<Ticket> {
        self.authorize(actor, actions::RESOLVE).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        if !ticket.is_accepted() {
            return Err(WorkflowError::InvalidTransition(
                "cannot resolve a ticket that has no acceptor".into(),
            ));
        }
        self.require_acceptor(&ticket, actor)?;
        let proposed = if is_resolved {
            ActivityAction::Resolved
        } else {
            ActivityAction::Reopened
        };
        let pending = self
            .enforce_sod(&ticket, actor, proposed, override_grant)
            .await?;
        let ticket = self
            .tickets
            .set_resolved(id, &actor.user_ref(), is_resolved)
            .await?;
        self.record_override(pending).await?;
        Ok(ticket)
    }

    /// Confirm another actor's resolution. The acceptor may not confirm
    /// their own work.
    pub async fn confirm_resolution(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        self.authorize(actor, actions::CONFIRM_RESOLUTION).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        if !ticket.resolved {
            return Err(WorkflowError::InvalidTransition(
                "cannot confirm an unresolved ticket".into(),
            ));
        }
        if ticket.accepted_by.as_ref().is_some_and(|a| a.id == actor.id) {
            return Err(WorkflowError::PermissionDenied(
                DenyReason::OwnershipRequired,
            ));
        }
        self.enforce_sod(&ticket, actor, ActivityAction::ResolutionConfirmed, None)
            .await?;
        self.tickets.confirm_resolution(id, &actor.user_ref()).await
    }

    /// Give up the acceptance. Clears acceptance, resolution, and the
    /// confirmed-resolution flag atomically.
    pub async fn reassign(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        self.authorize(actor, actions::REASSIGN).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        if !ticket.is_accepted() {
            return Err(WorkflowError::InvalidTransition(
                "cannot reassign a ticket that has no acceptor".into(),
            ));
        }
        self.require_acceptor(&ticket, actor)?;
        self.enforce_sod(&ticket, actor, ActivityAction::Reassigned, None)
            .await?;
        self.tickets.reassign(id, &actor.user_ref()).await
    }

    /// Force a ticket back to in-progress, clearing resolution and
    /// confirmation. A separate manager/admin-gated path from
    /// reopen-via-resolve.
    pub async fn reopen(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        self.authorize(actor, actions::REOPEN).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        self.enforce_sod(&ticket, actor, ActivityAction::Reopened, None)
            .await?;
        self.tickets.reopen(id, &actor.user_ref()).await
    }

    /// Set or clear the archival flag. Only the current acceptor; independent
    /// of resolution state.
    pub async fn archive(
        &self,
        actor: &Actor,
        id: TicketId,
        is_archived: bool,
        override_grant: Option<OverrideGrant>,
    ) -> Result<Ticket> {
        self.authorize(actor, actions::ARCHIVE).await?;
        let _gate = self.gate(id).await;
        let ticket = self.fetch(id).await?;
        self.require_acceptor(&ticket, actor)?;
        let proposed = if is_archived {
            ActivityAction::Archived
        } else {
            ActivityAction::Unarchived
        };
        let pending = self
            .enforce_sod(&ticket, actor, proposed, override_grant)
            .await?;
        let ticket = self
            .tickets
            .set_archived(id, &actor.user_ref(), is_archived)
            .await?;
        self.record_override(pending).await?;
        Ok(ticket)
    }

    /// Delete a ticket, cascading all dependent records. Admin territory in
    /// the default matrix; the permission gate runs before storage is touched.
    pub async fn delete(&self, actor: &Actor, id: TicketId) -> Result<()> {
        self.authorize(actor, actions::DELETE).await?;
        let gate = self.gate(id).await;
        self.tickets.delete(id, &actor.user_ref()).await?;
        drop(gate);
        self.gates.lock().await.remove(&id);
        info!(ticket = %id, actor = %actor.username, "ticket deleted with cascade");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Gates
    // ------------------------------------------------------------------

    /// Acquire the ticket's gauntlet gate. Held across the SoD scan and the
    /// store transition it authorizes, so another actor's transition cannot
    /// commit a conflicting activity entry in between. Gates are created on
    /// demand and dropped when the ticket is deleted.
    async fn gate(&self, id: TicketId) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().await;
            gates.entry(id).or_default().clone()
        };
        gate.lock_owned().await
    }

    async fn authorize(&self, actor: &Actor, action: &str) -> Result<()> {
        self.evaluator
            .authorize_mutation(&actor.role, TICKETS_CATEGORY, action)
            .await?;
        Ok(())
    }

    async fn fetch(&self, id: TicketId) -> Result<Ticket> {
        self.tickets
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                resource: "ticket",
                id: id.to_string(),
            })
    }

    fn require_acceptor(&self, ticket: &Ticket, actor: &Actor) -> Result<()> {
        match &ticket.accepted_by {
            Some(acceptor) if acceptor.id == actor.id => Ok(()),
            _ => Err(WorkflowError::PermissionDenied(
                DenyReason::OwnershipRequired,
            )),
        }
    }

    fn require_participant(&self, ticket: &Ticket, actor: &Actor) -> Result<()> {
        let is_acceptor = ticket
            .accepted_by
            .as_ref()
            .is_some_and(|a| a.id == actor.id);
        if is_acceptor || ticket.is_collaborator(actor.id) {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied(
                DenyReason::OwnershipRequired,
            ))
        }
    }

    /// Run the SoD gate. A soft denial with a valid override grant authorizes
    /// the transition and hands back the override record, which the caller
    /// writes once the transition commits; everything else denies.
    async fn enforce_sod(
        &self,
        ticket: &Ticket,
        actor: &Actor,
        proposed: ActivityAction,
        override_grant: Option<OverrideGrant>,
    ) -> Result<Option<SodOverrideInput>> {
        let decision = self.sod.check(ticket, actor.id, proposed).await?;
        let SodDecision::Denied {
            conflicting_action,
            enforcement,
        } = decision
        else {
            return Ok(None);
        };

        let Some(grant) = override_grant else {
            return Err(WorkflowError::SodConflict {
                action: proposed,
                conflicting_action,
                enforcement,
            });
        };

        // The override is itself authorization-checked: hard denials cannot
        // be overridden, and the approver must hold manager rank.
        if enforcement == SodEnforcement::Hard {
            return Err(WorkflowError::OverrideNotPermitted(
                "enforcement mode is hard".into(),
            ));
        }
        if !self
            .evaluator
            .catalog()
            .at_least(&grant.approver.role, "manager")
        {
            return Err(WorkflowError::OverrideNotPermitted(format!(
                "approver role '{}' is below manager rank",
                grant.approver.role
            )));
        }

        Ok(Some(SodOverrideInput {
            ticket_id: ticket.id,
            blocked_actor: actor.user_ref(),
            blocked_action: proposed,
            overridden_by: grant.approver.user_ref(),
            reason: grant.reason,
        }))
    }

    /// Write the exercised-override record. Called only after the overridden
    /// transition has committed, so a failed transition never leaves a record
    /// of a bypass that did not happen.
    async fn record_override(&self, pending: Option<SodOverrideInput>) -> Result<()> {
        let Some(input) = pending else {
            return Ok(());
        };
        warn!(
            ticket = %input.ticket_id,
            blocked_actor = %input.blocked_actor.username,
            blocked_action = %input.blocked_action,
            approver = %input.overridden_by.username,
            "soft SoD denial overridden"
        );
        self.overrides.record(input).await?;
        Ok(())
    }
}

/// Extract `@username` tokens from comment text, deduplicated in order of
/// first appearance. Usernames are alphanumeric plus `_` and `-`.
fn parse_mentions(text: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let Some(rest) = token.strip_prefix('@') else {
            continue;
        };
        let name: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if !name.is_empty() && !mentions.contains(&name) {
            mentions.push(name);
        }
    }
    mentions
}
