//! Service layer for the ticket workflow.
//!
//! Services orchestrate the permission evaluator, the SoD checker, and the
//! stores; they own no state of their own.

pub mod lifecycle;
pub mod overrides;
pub mod policy;
pub mod sod;
pub mod stats;

pub use lifecycle::TicketService;
pub use overrides::{InMemoryOverrideStore, OverrideStore, SodOverride, SodOverrideInput};
pub use policy::{InMemoryOrgPolicyStore, OrgPolicy, OrgPolicyService, OrgPolicyStore};
pub use sod::{OverrideGrant, SodChecker, SodDecision, SodPolicy};
pub use stats::{TicketStats, TicketStatsService};
