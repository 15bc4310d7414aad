//! Ticket permission vocabulary and the default deployment matrix.
//!
//! Category and action strings are matched exactly by the permission matrix,
//! so they live here as constants rather than scattered literals.

use vulnboard_authorization::{AccessLevel, PermissionEntry};

/// The permission category all ticket actions live under.
pub const TICKETS_CATEGORY: &str = "tickets";

/// Action strings for the tickets category.
pub mod actions {
    /// Read tickets and ticket statistics.
    pub const VIEW: &str = "view tickets";
    /// File a new ticket.
    pub const CREATE: &str = "create tickets";
    /// Take responsibility for a ticket.
    pub const ACCEPT: &str = "accept tickets";
    /// Mark a ticket resolved (or revert a resolution).
    pub const RESOLVE: &str = "resolve tickets";
    /// Give up an acceptance.
    pub const REASSIGN: &str = "reassign tickets";
    /// Force a resolved ticket back to in-progress.
    pub const REOPEN: &str = "reopen tickets";
    /// Comment on a ticket.
    pub const COMMENT: &str = "comment tickets";
    /// Mark a comment's feedback addressed.
    pub const FIX_COMMENT: &str = "fix comment tickets";
    /// Confirm another actor's resolution.
    pub const CONFIRM_RESOLUTION: &str = "accept ticket resolution";
    /// Archive or unarchive a ticket.
    pub const ARCHIVE: &str = "archive tickets";
    /// Delete a ticket and cascade its dependent records.
    pub const DELETE: &str = "delete tickets";
}

/// The default ticket matrix over the viewer/analyst/manager/admin catalog.
///
/// Unlisted triples stay blocked; a deployment edits rows through the
/// admin-gated matrix CRUD rather than by changing these defaults.
#[must_use]
pub fn default_ticket_entries() -> Vec<PermissionEntry> {
    let mut entries = Vec::new();

    let entry = |action: &str, role: &str, level: AccessLevel| {
        PermissionEntry::new(TICKETS_CATEGORY, action, role, level)
    };

    for role in ["viewer", "analyst", "manager", "admin"] {
        entries.push(entry(actions::VIEW, role, AccessLevel::ReadOnly));
    }

    // Analyst-and-up read/write actions.
    for action in [
        actions::CREATE,
        actions::ACCEPT,
        actions::RESOLVE,
        actions::COMMENT,
        actions::FIX_COMMENT,
        actions::CONFIRM_RESOLUTION,
        actions::ARCHIVE,
    ] {
        for role in ["analyst", "manager", "admin"] {
            entries.push(entry(action, role, AccessLevel::ReadWrite));
        }
    }

    // Manager-and-up paths.
    for action in [actions::REASSIGN, actions::REOPEN] {
        for role in ["manager", "admin"] {
            entries.push(entry(action, role, AccessLevel::ReadWrite));
        }
    }

    // Deletion is admin territory; a manager's request is held for admin
    // sign-off instead of applied.
    entries.push(entry(actions::DELETE, "manager", AccessLevel::AdminApproval));
    entries.push(entry(actions::DELETE, "admin", AccessLevel::ReadWrite));

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_block_viewer_mutations() {
        let entries = default_ticket_entries();
        assert!(!entries
            .iter()
            .any(|e| e.role == "viewer" && e.level == AccessLevel::ReadWrite));
    }

    #[test]
    fn test_defaults_give_viewer_read() {
        let entries = default_ticket_entries();
        assert!(entries.iter().any(|e| e.role == "viewer"
            && e.action == actions::VIEW
            && e.level == AccessLevel::ReadOnly));
    }

    #[test]
    fn test_delete_is_admin_gated() {
        let entries = default_ticket_entries();
        let manager = entries
            .iter()
            .find(|e| e.action == actions::DELETE && e.role == "manager")
            .unwrap();
        assert_eq!(manager.level, AccessLevel::AdminApproval);
        assert!(!entries
            .iter()
            .any(|e| e.action == actions::DELETE && e.role == "analyst"));
    }

    #[test]
    fn test_reopen_is_manager_gated() {
        let entries = default_ticket_entries();
        assert!(!entries
            .iter()
            .any(|e| e.action == actions::REOPEN && e.role == "analyst"));
        assert!(entries.iter().any(|e| e.action == actions::REOPEN
            && e.role == "manager"
            && e.level == AccessLevel::ReadWrite));
    }

    #[test]
    fn test_no_duplicate_triples() {
        let entries = default_ticket_entries();
        for (i, e) in entries.iter().enumerate() {
            assert!(
                !entries[..i]
                    .iter()
                    .any(|o| o.category == e.category && o.action == e.action && o.role == e.role),
                "duplicate entry for {}/{}/{}",
                e.category,
                e.action,
                e.role
            );
        }
    }
}
