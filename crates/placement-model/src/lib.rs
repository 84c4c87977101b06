//! Placement Model - domain records
//!
//! Defines the persistent record types shared by the whole workspace:
//! - Contract records with succession pointers and sync bookkeeping
//! - Insurance policy records with their contract binding
//! - Append-only sync audit entries
//! - Typed record ids and party identities
//!
//! Pure data: no storage, no business rules.

#![warn(unreachable_pub)]

pub mod contract;
pub mod identity;
pub mod ids;
pub mod policy;
pub mod sync_log;

// Re-exports for convenience
pub use contract::{
    generate_contract_number, Contract, ContractStatus, ServiceKind, SyncBookkeeping, SyncStatus,
};
pub use identity::{CustomerIdentity, WorkerIdentity};
pub use ids::{ContractId, PolicyId, SyncLogId};
pub use policy::{generate_agency_ref, InsurancePolicy, InsuredPerson, PolicyStatus};
pub use sync_log::{SyncLogEntry, SyncOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with placement records
    pub use crate::{
        Contract, ContractId, ContractStatus, CustomerIdentity, InsurancePolicy, InsuredPerson,
        PolicyId, PolicyStatus, SyncLogEntry, SyncOutcome, SyncStatus, WorkerIdentity,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
