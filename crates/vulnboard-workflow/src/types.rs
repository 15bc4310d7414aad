//! Type definitions for the ticket-workflow domain.
//!
//! Includes newtype wrappers for IDs, the activity-action vocabulary, and the
//! derived ticket status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub Uuid);

impl TicketId {
    /// Create a new random TicketId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TicketId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<TicketId> for Uuid {
    fn from(id: TicketId) -> Self {
        id.0
    }
}

/// Unique identifier for a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub Uuid);

impl CommentId {
    /// Create a new random CommentId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CommentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<CommentId> for Uuid {
    fn from(id: CommentId) -> Self {
        id.0
    }
}

/// Unique identifier for an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    /// Create a new random ActivityId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ActivityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ActivityId> for Uuid {
    fn from(id: ActivityId) -> Self {
        id.0
    }
}

/// Unique identifier for an SoD override record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideId(pub Uuid);

impl OverrideId {
    /// Create a new random OverrideId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for OverrideId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OverrideId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<OverrideId> for Uuid {
    fn from(id: OverrideId) -> Self {
        id.0
    }
}

// ============================================================================
// Identities
// ============================================================================

/// A reference to a user: identity plus the username mentions resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Stable user identity.
    pub id: Uuid,
    /// Username, used for `@mention` resolution and display.
    pub username: String,
}

impl UserRef {
    /// Create a user reference.
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// A verified actor, as handed to the core by the identity provider.
///
/// The core trusts this triple completely and performs no credential checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identity.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Role name, matched against the role catalog.
    pub role: String,
}

impl Actor {
    /// Create an actor.
    pub fn new(id: Uuid, username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: role.into(),
        }
    }

    /// The actor's user reference, for storage in ticket records.
    #[must_use]
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

// ============================================================================
// Activity
// ============================================================================

/// The closed vocabulary of actions recorded in a ticket's activity history.
///
/// These labels are the inputs to SoD conflict scans, so the set is an enum
/// rather than free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Ticket was filed.
    Created,
    /// An actor took responsibility for the ticket.
    Accepted,
    /// The acceptor marked the ticket resolved.
    Resolved,
    /// Resolution was reverted or the ticket was force-reopened.
    Reopened,
    /// The acceptor gave the ticket up; acceptance and resolution reset.
    Reassigned,
    /// Ticket was archived.
    Archived,
    /// Ticket was unarchived.
    Unarchived,
    /// A comment was added.
    CommentAdded,
    /// A comment was marked as fixed.
    CommentFixed,
    /// The resolution was confirmed by someone other than the acceptor.
    ResolutionConfirmed,
    /// A mentioned user was added as collaborator (detail names the user).
    CollaboratorAdded,
    /// Ticket deletion; appended before the cascade removes the record.
    Deleted,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Accepted => write!(f, "Accepted"),
            Self::Resolved => write!(f, "Resolved"),
            Self::Reopened => write!(f, "Reopened"),
            Self::Reassigned => write!(f, "Reassigned"),
            Self::Archived => write!(f, "Archived"),
            Self::Unarchived => write!(f, "Unarchived"),
            Self::CommentAdded => write!(f, "Comment added"),
            Self::CommentFixed => write!(f, "Comment marked as Fixed"),
            Self::ResolutionConfirmed => write!(f, "Resolution confirmed"),
            Self::CollaboratorAdded => write!(f, "Collaborator added"),
            Self::Deleted => write!(f, "Deleted"),
        }
    }
}

/// One immutable row of a ticket's activity history.
///
/// Entries are append-only and survive reversal of the action they record:
/// an `Accepted` entry stays in the history after a later `Reassigned` clears
/// the acceptance itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unique identifier.
    pub id: ActivityId,
    /// Who performed the action.
    pub actor: UserRef,
    /// What was done.
    pub action: ActivityAction,
    /// Optional detail (e.g. the username for `CollaboratorAdded`).
    pub detail: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Enforcement & Status
// ============================================================================

/// Organization-wide SoD enforcement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SodEnforcement {
    /// Conflicts are final; no override possible.
    #[default]
    Hard,
    /// Conflicts may be overridden by a manager-rank actor, with a logged record.
    Soft,
}

impl fmt::Display for SodEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

/// Derived display status of a ticket.
///
/// Status is not stored; it is derived from independent state fields in a
/// fixed priority order (multiple dimensions can be true simultaneously).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// No acceptance, resolution, or archival.
    Open,
    /// Explicit in-progress record, or the ticket is accepted.
    InProgress,
    /// Resolution flag set.
    Resolved,
    /// Archival flag set; wins over everything else.
    Archived,
}

impl TicketStatus {
    /// Derive the display status. Priority: Archived > Resolved > InProgress
    /// > Open. A resolved-and-archived ticket displays as Archived, never both.
    #[must_use]
    pub fn derive(archived: bool, resolved: bool, in_progress: bool, accepted: bool) -> Self {
        if archived {
            Self::Archived
        } else if resolved {
            Self::Resolved
        } else if in_progress || accepted {
            Self::InProgress
        } else {
            Self::Open
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Resolved => write!(f, "Resolved"),
            Self::Archived => write!(f, "Archived"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_priority_archived_wins() {
        // Resolved and archived simultaneously must display as Archived.
        assert_eq!(
            TicketStatus::derive(true, true, true, true),
            TicketStatus::Archived
        );
        assert_eq!(
            TicketStatus::derive(true, false, false, false),
            TicketStatus::Archived
        );
    }

    #[test]
    fn test_status_priority_resolved_over_in_progress() {
        assert_eq!(
            TicketStatus::derive(false, true, true, true),
            TicketStatus::Resolved
        );
    }

    #[test]
    fn test_status_in_progress_from_acceptance_or_record() {
        assert_eq!(
            TicketStatus::derive(false, false, true, false),
            TicketStatus::InProgress
        );
        assert_eq!(
            TicketStatus::derive(false, false, false, true),
            TicketStatus::InProgress
        );
    }

    #[test]
    fn test_status_default_open() {
        assert_eq!(
            TicketStatus::derive(false, false, false, false),
            TicketStatus::Open
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TicketStatus::InProgress.to_string(), "In Progress");
        assert_eq!(TicketStatus::Archived.to_string(), "Archived");
    }

    #[test]
    fn test_activity_action_display() {
        assert_eq!(ActivityAction::Accepted.to_string(), "Accepted");
        assert_eq!(
            ActivityAction::CommentFixed.to_string(),
            "Comment marked as Fixed"
        );
        assert_eq!(
            ActivityAction::CollaboratorAdded.to_string(),
            "Collaborator added"
        );
    }

    #[test]
    fn test_enforcement_display() {
        assert_eq!(SodEnforcement::Hard.to_string(), "hard");
        assert_eq!(SodEnforcement::Soft.to_string(), "soft");
    }

    #[test]
    fn test_wire_representation() {
        // Exported records use snake_case actions and lowercase enforcement.
        assert_eq!(
            serde_json::to_value(ActivityAction::ResolutionConfirmed).unwrap(),
            serde_json::json!("resolution_confirmed")
        );
        assert_eq!(
            serde_json::to_value(SodEnforcement::Soft).unwrap(),
            serde_json::json!("soft")
        );
        assert_eq!(
            serde_json::to_value(TicketStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
    }

    #[test]
    fn test_ticket_id_roundtrip() {
        let raw = Uuid::new_v4();
        let id = TicketId::from(raw);
        assert_eq!(id.into_inner(), raw);
        assert_eq!(id.to_string(), raw.to_string());
    }
}
