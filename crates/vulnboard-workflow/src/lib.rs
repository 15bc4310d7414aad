//! Ticket workflow and separation-of-duties (`SoD`) domain logic.
//!
//! This crate provides the core domain logic for the vulnerability ticket
//! lifecycle, from filing through acceptance, resolution, confirmation,
//! archival, and deletion.
//!
//! # Features
//!
//! - Ticket aggregate with comments, collaborators, and an append-only
//!   activity history
//! - Atomic state transitions with precondition re-checks at the store
//! - `SoD` conflict detection against the actor's own activity history
//! - Hard/soft enforcement with logged manager overrides in soft mode
//! - Org-wide policy singleton read fresh on every decision
//! - `@mention` resolution adding commenters as collaborators
//! - Aggregate ticket statistics
//!
//! # Services
//!
//! The [`services`] module provides business logic for:
//! - [`services::TicketService`] - Permission/ownership/`SoD`-gated transitions
//! - [`services::SodChecker`] - Conflict scans over ticket activity
//! - [`services::OrgPolicyService`] - Admin-gated enforcement-mode changes
//! - [`services::TicketStatsService`] - Point-in-time summaries
//!
//! Every mutating operation passes through the same gate order: role
//! permission, ownership where applicable, `SoD` check, atomic store
//! transition. Permission checks delegate to
//! [`vulnboard_authorization::PermissionEvaluator`].

pub mod directory;
pub mod error;
pub mod permissions;
pub mod services;
pub mod ticket;
pub mod types;

// Re-export commonly used types
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use error::{DenyReason, Result, WorkflowError};
pub use services::{
    InMemoryOrgPolicyStore, InMemoryOverrideStore, OrgPolicy, OrgPolicyService, OrgPolicyStore,
    OverrideGrant, OverrideStore, SodChecker, SodDecision, SodOverride, SodOverrideInput,
    SodPolicy, TicketService, TicketStats, TicketStatsService,
};
pub use ticket::{Comment, CreateTicketInput, InMemoryTicketStore, Ticket, TicketStore};
pub use types::{
    ActivityAction, ActivityEntry, ActivityId, Actor, CommentId, OverrideId, SodEnforcement,
    TicketId, TicketStatus, UserRef,
};
