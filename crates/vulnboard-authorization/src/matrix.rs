//! Permission matrix: (category, action, role) -> access level.
//!
//! The matrix is fail-closed: any triple without an entry evaluates to
//! [`AccessLevel::Blocked`]. Category and action are opaque strings matched
//! exactly (case-sensitive).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// Outcome of a permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// The role may not attempt the action at all.
    #[default]
    Blocked,
    /// Non-mutating reads only.
    ReadOnly,
    /// The mutation is allowed (still subject to SoD checks).
    ReadWrite,
    /// The mutation must be held for manager sign-off.
    ManagerApproval,
    /// The mutation must be held for admin sign-off.
    AdminApproval,
}

impl AccessLevel {
    /// Whether this level permits non-mutating reads.
    #[must_use]
    pub fn allows_read(self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// The approval tier this level requires, if any.
    #[must_use]
    pub fn approval_tier(self) -> Option<ApprovalTier> {
        match self {
            Self::ManagerApproval => Some(ApprovalTier::Manager),
            Self::AdminApproval => Some(ApprovalTier::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked"),
            Self::ReadOnly => write!(f, "read only"),
            Self::ReadWrite => write!(f, "read/write"),
            Self::ManagerApproval => write!(f, "managerial approval"),
            Self::AdminApproval => write!(f, "admin approval"),
        }
    }
}

/// The tier that must sign off on a held mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    /// Manager rank or higher.
    Manager,
    /// Admin rank.
    Admin,
}

impl fmt::Display for ApprovalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A single row of the permission matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Permission category (e.g. "tickets").
    pub category: String,
    /// Action within the category (e.g. "accept tickets").
    pub action: String,
    /// Role name the entry applies to.
    pub role: String,
    /// Granted access level.
    pub level: AccessLevel,
}

impl PermissionEntry {
    /// Create an entry.
    pub fn new(
        category: impl Into<String>,
        action: impl Into<String>,
        role: impl Into<String>,
        level: AccessLevel,
    ) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            role: role.into(),
            level,
        }
    }
}

/// Trait for permission matrix storage backends.
#[async_trait::async_trait]
pub trait PermissionStore: Send + Sync {
    /// Look up the level for a triple. `None` means no entry (caller treats
    /// as blocked).
    async fn get(&self, category: &str, action: &str, role: &str) -> Result<Option<AccessLevel>>;

    /// Insert or replace the entry for a triple.
    async fn set(&self, entry: PermissionEntry) -> Result<()>;

    /// Remove the entry for a triple. Returns whether an entry existed.
    async fn remove(&self, category: &str, action: &str, role: &str) -> Result<bool>;

    /// List all entries.
    async fn list(&self) -> Result<Vec<PermissionEntry>>;
}

/// In-memory permission store for testing.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    entries: Arc<RwLock<HashMap<(String, String, String), AccessLevel>>>,
}

impl InMemoryPermissionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a store pre-populated with the given entries.
    pub async fn seeded(entries: Vec<PermissionEntry>) -> Self {
        let store = Self::new();
        {
            let mut map = store.entries.write().await;
            for e in entries {
                map.insert((e.category, e.action, e.role), e.level);
            }
        }
        store
    }

    /// Entry count.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn get(&self, category: &str, action: &str, role: &str) -> Result<Option<AccessLevel>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(category.to_string(), action.to_string(), role.to_string()))
            .copied())
    }

    async fn set(&self, entry: PermissionEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert((entry.category, entry.action, entry.role), entry.level);
        Ok(())
    }

    async fn remove(&self, category: &str, action: &str, role: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(&(category.to_string(), action.to_string(), role.to_string()))
            .is_some())
    }

    async fn list(&self) -> Result<Vec<PermissionEntry>> {
        let entries = self.entries.read().await;
        let mut list: Vec<_> = entries
            .iter()
            .map(|((category, action, role), level)| PermissionEntry {
                category: category.clone(),
                action: action.clone(),
                role: role.clone(),
                level: *level,
            })
            .collect();
        list.sort_by(|a, b| {
            (&a.category, &a.action, &a.role).cmp(&(&b.category, &b.action, &b.role))
        });
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_entry_is_none() {
        let store = InMemoryPermissionStore::new();
        let level = store.get("tickets", "accept tickets", "analyst").await.unwrap();
        assert!(level.is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryPermissionStore::new();
        store
            .set(PermissionEntry::new(
                "tickets",
                "accept tickets",
                "analyst",
                AccessLevel::ReadWrite,
            ))
            .await
            .unwrap();

        let level = store.get("tickets", "accept tickets", "analyst").await.unwrap();
        assert_eq!(level, Some(AccessLevel::ReadWrite));
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let store = InMemoryPermissionStore::new();
        store
            .set(PermissionEntry::new(
                "tickets",
                "delete tickets",
                "manager",
                AccessLevel::ReadWrite,
            ))
            .await
            .unwrap();
        store
            .set(PermissionEntry::new(
                "tickets",
                "delete tickets",
                "manager",
                AccessLevel::AdminApproval,
            ))
            .await
            .unwrap();

        assert_eq!(store.count().await, 1);
        let level = store.get("tickets", "delete tickets", "manager").await.unwrap();
        assert_eq!(level, Some(AccessLevel::AdminApproval));
    }

    #[tokio::test]
    async fn test_case_sensitive_match() {
        let store = InMemoryPermissionStore::new();
        store
            .set(PermissionEntry::new(
                "tickets",
                "accept tickets",
                "analyst",
                AccessLevel::ReadWrite,
            ))
            .await
            .unwrap();

        let level = store.get("Tickets", "accept tickets", "analyst").await.unwrap();
        assert!(level.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryPermissionStore::new();
        store
            .set(PermissionEntry::new(
                "tickets",
                "view tickets",
                "viewer",
                AccessLevel::ReadOnly,
            ))
            .await
            .unwrap();

        assert!(store.remove("tickets", "view tickets", "viewer").await.unwrap());
        assert!(!store.remove("tickets", "view tickets", "viewer").await.unwrap());
        assert_eq!(store.count().await, 0);
    }

    #[test]
    fn test_access_level_display() {
        assert_eq!(AccessLevel::Blocked.to_string(), "blocked");
        assert_eq!(AccessLevel::ReadOnly.to_string(), "read only");
        assert_eq!(AccessLevel::ReadWrite.to_string(), "read/write");
        assert_eq!(AccessLevel::ManagerApproval.to_string(), "managerial approval");
        assert_eq!(AccessLevel::AdminApproval.to_string(), "admin approval");
    }

    #[test]
    fn test_approval_tier() {
        assert_eq!(AccessLevel::ManagerApproval.approval_tier(), Some(ApprovalTier::Manager));
        assert_eq!(AccessLevel::AdminApproval.approval_tier(), Some(ApprovalTier::Admin));
        assert_eq!(AccessLevel::ReadWrite.approval_tier(), None);
    }
}
