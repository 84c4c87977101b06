//! Placement Store - storage ports and in-memory implementations
//!
//! Defines the storage seams the rest of the workspace depends on:
//! - [`ChainStore`] for contract records and succession links
//! - [`PolicyStore`] for insurance policy records
//! - [`SyncLogStore`] for the append-only reconciliation audit trail
//!
//! The chain store is the single place that enforces link atomicity (both
//! sides of a succession link commit together) and the conditional
//! sync-guard write ([`ChainStore::try_begin_sync`]).
//!
//! The in-memory implementations back tests and single-process deployments;
//! a database-backed implementation plugs in behind the same traits.

#![warn(unreachable_pub)]

pub mod error;
pub mod memory;
pub mod traits;

// Re-exports for convenience
pub use error::StoreError;
pub use memory::{MemoryChainStore, MemoryPolicyStore, MemorySyncLog};
pub use traits::{ChainStore, PolicyStore, SyncLogStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
