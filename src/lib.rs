//! Policy-driven approval workflow engine for fuel-station back-office
//! actions.
//!
//! Sensitive actions (expense approval, stock adjustment, sale void,
//! discount override, shift-close variance) are checked against configured
//! policies; gated actions move through a sequential chain of
//! permission-gated approval steps before the caller may commit them.
//! Persistence and actor identity are trait seams — see
//! [`infrastructure::store::ApprovalStore`] and
//! [`infrastructure::directory::ActorDirectory`] — with in-memory
//! implementations shipped for embedding and tests.

pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod telemetry;
pub mod validation;
