//! Ticket aggregate and storage seam.
//!
//! A ticket carries its comments, collaborators, and activity history as one
//! aggregate, and every [`TicketStore`] method is an atomic per-ticket
//! transition: it re-validates its precondition, mutates, and appends the
//! matching activity entry in a single store operation. Two concurrent
//! `accept` calls reach the store and exactly one survives the re-check.
//!
//! Service-level permission/SoD checks happen before the store call and are
//! advisory; the store owns the state preconditions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, WorkflowError};
use crate::types::{
    ActivityAction, ActivityEntry, ActivityId, CommentId, TicketId, TicketStatus, UserRef,
};

// ============================================================================
// Aggregate Types
// ============================================================================

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier.
    pub id: CommentId,
    /// Who wrote it.
    pub author: UserRef,
    /// Comment text; may contain `@username` mentions.
    pub text: String,
    /// When it was written.
    pub created_at: DateTime<Utc>,
    /// Whether the feedback was marked addressed.
    pub fixed: bool,
    /// When it was marked addressed.
    pub fixed_at: Option<DateTime<Utc>>,
}

/// A remediation ticket with its full dependent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique identifier.
    pub id: TicketId,
    /// Who filed the ticket.
    pub creator: UserRef,
    /// What needs doing.
    pub description: String,
    /// Feature tag the ticket relates to.
    pub feature: String,
    /// When it was filed.
    pub created_at: DateTime<Utc>,
    /// The current acceptor, if any.
    pub accepted_by: Option<UserRef>,
    /// Resolution flag.
    pub resolved: bool,
    /// When resolution was set.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Whether the resolution was confirmed by someone other than the acceptor.
    pub resolution_confirmed: bool,
    /// Archival flag.
    pub archived: bool,
    /// When archival was set.
    pub archived_at: Option<DateTime<Utc>>,
    /// Explicit in-progress status record (set by reopen).
    pub in_progress: bool,
    /// Mentioned users added as collaborators, in addition order, deduplicated.
    pub collaborators: Vec<UserRef>,
    /// Comments in creation order.
    pub comments: Vec<Comment>,
    /// Append-only activity history, the authoritative input to SoD scans.
    pub activity: Vec<ActivityEntry>,
}

impl Ticket {
    /// Whether the ticket currently has an acceptor.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted_by.is_some()
    }

    /// Whether the user is a collaborator.
    #[must_use]
    pub fn is_collaborator(&self, user_id: Uuid) -> bool {
        self.collaborators.iter().any(|c| c.id == user_id)
    }

    /// Derived display status.
    #[must_use]
    pub fn status(&self) -> TicketStatus {
        TicketStatus::derive(
            self.archived,
            self.resolved,
            self.in_progress,
            self.is_accepted(),
        )
    }
}

/// Input for filing a ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketInput {
    /// Who is filing.
    pub creator: UserRef,
    /// Description text.
    pub description: String,
    /// Feature tag.
    pub feature: String,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Trait for ticket storage backends.
///
/// Each method is one atomic transition on one ticket: precondition re-check,
/// mutation, and activity append happen under the store's per-ticket
/// serialization, or not at all. Implementations must append the activity
/// entry in the same unit of work as the mutation it describes.
#[async_trait::async_trait]
pub trait TicketStore: Send + Sync {
    /// Create a ticket in the Open state with its `Created` activity entry.
    async fn create(&self, input: CreateTicketInput) -> Result<Ticket>;

    /// Fetch a ticket.
    async fn get(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// List all tickets.
    async fn list(&self) -> Result<Vec<Ticket>>;

    /// Set the acceptor. Fails with `InvalidTransition` if an acceptance is
    /// already active; of two concurrent calls exactly one succeeds.
    async fn accept(&self, id: TicketId, actor: &UserRef) -> Result<Ticket>;

    /// Append a comment. `new_collaborators` are mention candidates; the
    /// store drops any that are the creator, the current acceptor, or already
    /// collaborators, then appends one `CollaboratorAdded` entry per user it
    /// actually added, followed by the `CommentAdded` entry.
    async fn add_comment(
        &self,
        id: TicketId,
        author: &UserRef,
        text: String,
        new_collaborators: Vec<UserRef>,
    ) -> Result<(Ticket, CommentId)>;

    /// Mark a comment's feedback addressed.
    async fn fix_comment(
        &self,
        id: TicketId,
        comment_id: CommentId,
        actor: &UserRef,
    ) -> Result<Ticket>;

    /// Set or clear the resolution flag. Requires an active acceptance.
    /// Setting appends `Resolved`; clearing appends `Reopened`.
    async fn set_resolved(&self, id: TicketId, actor: &UserRef, is_resolved: bool)
        -> Result<Ticket>;

    /// Confirm the resolution. Requires the ticket be resolved and not yet
    /// confirmed.
    async fn confirm_resolution(&self, id: TicketId, actor: &UserRef) -> Result<Ticket>;

    /// Clear acceptance, resolution, and the confirmed-resolution flag in one
    /// step (all or nothing), appending `Reassigned`. Requires an active
    /// acceptance.
    async fn reassign(&self, id: TicketId, actor: &UserRef) -> Result<Ticket>;

    /// Clear resolution and confirmation and force the explicit in-progress
    /// record, appending `Reopened`.
    async fn reopen(&self, id: TicketId, actor: &UserRef) -> Result<Ticket>;

    /// Set or clear the archival flag, appending `Archived`/`Unarchived`.
    async fn set_archived(&self, id: TicketId, actor: &UserRef, is_archived: bool)
        -> Result<Ticket>;

    /// Delete the ticket, cascading all dependent records. The `Deleted`
    /// activity entry is appended before the cascade runs, not after.
    async fn delete(&self, id: TicketId, actor: &UserRef) -> Result<()>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory ticket store for testing.
///
/// A single `RwLock` over the map gives the per-ticket serializability the
/// trait contract requires (write transitions never interleave).
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<HashMap<Uuid, Ticket>>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tickets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Ticket count.
    pub async fn count(&self) -> usize {
        self.tickets.read().await.len()
    }

    fn not_found(id: TicketId) -> WorkflowError {
        WorkflowError::NotFound {
            resource: "ticket",
            id: id.to_string(),
        }
    }

    fn push_activity(
        ticket: &mut Ticket,
        actor: &UserRef,
        action: ActivityAction,
        detail: Option<String>,
    ) {
        ticket.activity.push(ActivityEntry {
            id: ActivityId::new(),
            actor: actor.clone(),
            action,
            detail,
            timestamp: Utc::now(),
        });
    }
}

#[async_trait::async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn create(&self, input: CreateTicketInput) -> Result<Ticket> {
        let now = Utc::now();
        let mut ticket = Ticket {
            id: TicketId::new(),
            creator: input.creator.clone(),
            description: input.description,
            feature: input.feature,
            created_at: now,
            accepted_by: None,
            resolved: false,
            resolved_at: None,
            resolution_confirmed: false,
            archived: false,
            archived_at: None,
            in_progress: false,
            collaborators: Vec::new(),
            comments: Vec::new(),
            activity: Vec::new(),
        };
        Self::push_activity(&mut ticket, &input.creator, ActivityAction::Created, None);

        let mut tickets = self.tickets.write().await;
        tickets.insert(ticket.id.into_inner(), ticket.clone());
        Ok(ticket)
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets.get(&id.into_inner()).cloned())
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut list: Vec<_> = tickets.values().cloned().collect();
        list.sort_by_key(|t| t.created_at);
        Ok(list)
    }

    async fn accept(&self, id: TicketId, actor: &UserRef) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        if ticket.accepted_by.is_some() {
            return Err(WorkflowError::InvalidTransition(
                "ticket is already accepted".into(),
            ));
        }

        ticket.accepted_by = Some(actor.clone());
        Self::push_activity(ticket, actor, ActivityAction::Accepted, None);
        Ok(ticket.clone())
    }

    async fn add_comment(
        &self,
        id: TicketId,
        author: &UserRef,
        text: String,
        new_collaborators: Vec<UserRef>,
    ) -> Result<(Ticket, CommentId)> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        // Re-filter candidates under the lock; membership may have changed
        // since the service read the ticket.
        for user in new_collaborators {
            if user.id == ticket.creator.id {
                continue;
            }
            if ticket.accepted_by.as_ref().is_some_and(|a| a.id == user.id) {
                continue;
            }
            if ticket.is_collaborator(user.id) {
                continue;
            }
            let username = user.username.clone();
            ticket.collaborators.push(user);
            Self::push_activity(
                ticket,
                author,
                ActivityAction::CollaboratorAdded,
                Some(username),
            );
        }

        let comment = Comment {
            id: CommentId::new(),
            author: author.clone(),
            text,
            created_at: Utc::now(),
            fixed: false,
            fixed_at: None,
        };
        let comment_id = comment.id;
        ticket.comments.push(comment);
        Self::push_activity(ticket, author, ActivityAction::CommentAdded, None);

        Ok((ticket.clone(), comment_id))
    }

    async fn fix_comment(
        &self,
        id: TicketId,
        comment_id: CommentId,
        actor: &UserRef,
    ) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        let comment = ticket
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or(WorkflowError::NotFound {
                resource: "comment",
                id: comment_id.to_string(),
            })?;

        comment.fixed = true;
        comment.fixed_at = Some(Utc::now());
        Self::push_activity(ticket, actor, ActivityAction::CommentFixed, None);
        Ok(ticket.clone())
    }

    async fn set_resolved(
        &self,
        id: TicketId,
        actor: &UserRef,
        is_resolved: bool,
    ) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        if ticket.accepted_by.is_none() {
            return Err(WorkflowError::InvalidTransition(
                "cannot resolve a ticket that has no acceptor".into(),
            ));
        }
        if ticket.resolved == is_resolved {
            return Err(WorkflowError::InvalidTransition(if is_resolved {
                "ticket is already resolved".into()
            } else {
                "ticket is not resolved".into()
            }));
        }

        ticket.resolved = is_resolved;
        if is_resolved {
            ticket.resolved_at = Some(Utc::now());
            Self::push_activity(ticket, actor, ActivityAction::Resolved, None);
        } else {
            ticket.resolved_at = None;
            ticket.resolution_confirmed = false;
            Self::push_activity(ticket, actor, ActivityAction::Reopened, None);
        }
        Ok(ticket.clone())
    }

    async fn confirm_resolution(&self, id: TicketId, actor: &UserRef) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        if !ticket.resolved {
            return Err(WorkflowError::InvalidTransition(
                "cannot confirm an unresolved ticket".into(),
            ));
        }
        if ticket.resolution_confirmed {
            return Err(WorkflowError::InvalidTransition(
                "resolution is already confirmed".into(),
            ));
        }

        ticket.resolution_confirmed = true;
        Self::push_activity(ticket, actor, ActivityAction::ResolutionConfirmed, None);
        Ok(ticket.clone())
    }

    async fn reassign(&self, id: TicketId, actor: &UserRef) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        if ticket.accepted_by.is_none() {
            return Err(WorkflowError::InvalidTransition(
                "cannot reassign a ticket that has no acceptor".into(),
            ));
        }

        // Acceptance, resolution, and confirmation reset together.
        ticket.accepted_by = None;
        ticket.resolved = false;
        ticket.resolved_at = None;
        ticket.resolution_confirmed = false;
        Self::push_activity(ticket, actor, ActivityAction::Reassigned, None);
        Ok(ticket.clone())
    }

    async fn reopen(&self, id: TicketId, actor: &UserRef) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        ticket.resolved = false;
        ticket.resolved_at = None;
        ticket.resolution_confirmed = false;
        ticket.in_progress = true;
        Self::push_activity(ticket, actor, ActivityAction::Reopened, None);
        Ok(ticket.clone())
    }

    async fn set_archived(
        &self,
        id: TicketId,
        actor: &UserRef,
        is_archived: bool,
    ) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        if ticket.archived == is_archived {
            return Err(WorkflowError::InvalidTransition(if is_archived {
                "ticket is already archived".into()
            } else {
                "ticket is not archived".into()
            }));
        }

        ticket.archived = is_archived;
        if is_archived {
            ticket.archived_at = Some(Utc::now());
            Self::push_activity(ticket, actor, ActivityAction::Archived, None);
        } else {
            ticket.archived_at = None;
            Self::push_activity(ticket, actor, ActivityAction::Unarchived, None);
        }
        Ok(ticket.clone())
    }

    async fn delete(&self, id: TicketId, actor: &UserRef) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&id.into_inner())
            .ok_or_else(|| Self::not_found(id))?;

        // Log before the destructive cascade so a partial failure cannot
        // leave an unlogged deletion.
        Self::push_activity(ticket, actor, ActivityAction::Deleted, None);
        tickets.remove(&id.into_inner());
        Ok(())
    }
}
