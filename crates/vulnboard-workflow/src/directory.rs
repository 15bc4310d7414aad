//! User directory seam for `@mention` resolution.
//!
//! The identity system owns user records; this core only needs to turn a
//! mentioned username into a [`UserRef`]. Unknown usernames resolve to `None`
//! and are silently skipped by the caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::UserRef;

/// Trait for resolving usernames to user references.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a username. `None` if no such user exists.
    async fn lookup(&self, username: &str) -> Result<Option<UserRef>>;
}

/// In-memory user directory for testing.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, UserRef>>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a user.
    pub async fn insert(&self, user: UserRef) {
        self.users.write().await.insert(user.username.clone(), user);
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup(&self, username: &str) -> Result<Option<UserRef>> {
        let users = self.users.read().await;
        Ok(users.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_lookup_known_user() {
        let directory = InMemoryUserDirectory::new();
        let bob = UserRef::new(Uuid::new_v4(), "bob");
        directory.insert(bob.clone()).await;

        let found = directory.lookup("bob").await.unwrap();
        assert_eq!(found, Some(bob));
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let directory = InMemoryUserDirectory::new();
        assert!(directory.lookup("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let directory = InMemoryUserDirectory::new();
        directory.insert(UserRef::new(Uuid::new_v4(), "Bob")).await;
        assert!(directory.lookup("bob").await.unwrap().is_none());
    }
}
