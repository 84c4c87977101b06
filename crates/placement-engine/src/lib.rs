//! Placement Engine - insurance reconciliation
//!
//! The engine keeps the externally held insurance ledger consistent with the
//! succession chain:
//! - on a contract's transition to active, decides between first-signing
//!   (bind existing policies) and worker-replacement (migrate the chain's
//!   policy to the new worker)
//! - guards every run with a conditional store write so a retried trigger
//!   can never double-process
//! - records every external attempt in the append-only sync audit trail
//! - runs as a fire-and-forget background task behind a bounded work queue
//!
//! Errors inside a reconciliation run are converted into a recorded sync
//! outcome; they never propagate into the status-update path that triggered
//! the run.

#![warn(unreachable_pub)]

pub mod gateway;
pub mod policy_ops;
pub mod queue;
pub mod reconcile;
pub mod report;

// Re-exports for convenience
pub use gateway::{AmendReceipt, GatewayError, InsuranceGateway, PlanTerms, PolicyIssue, PolicyRef};
pub use policy_ops::PolicyApplication;
pub use queue::{DispatchError, QueueStats, SyncQueue};
pub use reconcile::{EngineConfig, ReconcileError, ReconciliationEngine};
pub use report::{PolicyAction, PolicyOutcome, SyncDisposition, SyncReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
