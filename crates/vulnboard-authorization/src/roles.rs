//! Role catalog with a total rank order.
//!
//! Every privilege comparison in the system goes through rank numbers, never
//! role names, so renaming a role cannot change who outranks whom.

use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, Result};

/// A role in the catalog: a name and its rank in the total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, matched case-sensitively against actor roles.
    pub name: String,
    /// Rank in the catalog's total order; higher means more privileged.
    pub rank: u8,
}

impl Role {
    /// Create a role.
    pub fn new(name: impl Into<String>, rank: u8) -> Self {
        Self {
            name: name.into(),
            rank,
        }
    }
}

/// Ordered set of roles with strictly increasing ranks.
///
/// Unknown role names rank as 0, below every catalog role, so a lookup
/// failure never grants privilege.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCatalog {
    roles: Vec<Role>,
}

impl RoleCatalog {
    /// Build a catalog from roles ordered by rank.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::InvalidCatalog`] if the list is empty,
    /// contains a duplicate name, or the ranks do not strictly increase.
    pub fn new(roles: Vec<Role>) -> Result<Self> {
        if roles.is_empty() {
            return Err(AuthorizationError::InvalidCatalog(
                "catalog must contain at least one role".into(),
            ));
        }
        for pair in roles.windows(2) {
            if pair[1].rank <= pair[0].rank {
                return Err(AuthorizationError::InvalidCatalog(format!(
                    "ranks must strictly increase: {} ({}) then {} ({})",
                    pair[0].name, pair[0].rank, pair[1].name, pair[1].rank
                )));
            }
        }
        for (i, role) in roles.iter().enumerate() {
            if roles[..i].iter().any(|r| r.name == role.name) {
                return Err(AuthorizationError::InvalidCatalog(format!(
                    "duplicate role name: {}",
                    role.name
                )));
            }
        }
        Ok(Self { roles })
    }

    /// The default deployment catalog: viewer < analyst < manager < admin.
    #[must_use]
    pub fn default_catalog() -> Self {
        Self {
            roles: vec![
                Role::new("viewer", 1),
                Role::new("analyst", 2),
                Role::new("manager", 3),
                Role::new("admin", 4),
            ],
        }
    }

    /// Look up a role by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Whether the name exists in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rank of a role name; unknown names rank 0.
    #[must_use]
    pub fn rank(&self, name: &str) -> u8 {
        self.get(name).map_or(0, |r| r.rank)
    }

    /// Whether `role` is at least as privileged as `threshold`.
    ///
    /// Compares ranks, never names. An unknown `role` is never at least as
    /// privileged as any catalog role.
    #[must_use]
    pub fn at_least(&self, role: &str, threshold: &str) -> bool {
        let need = self.rank(threshold);
        need > 0 && self.rank(role) >= need
    }

    /// All roles, ordered by rank.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}
