//! Placement Chain - succession-chain traversal
//!
//! Pure algorithms over the [`ChainStore`](placement_store::ChainStore):
//! - forward/backward walks with an explicit visited set (a malformed chain
//!   can never loop forever)
//! - the bounded policy-ownership search used by reconciliation
//! - cascade-set computation for chain deletion
//!
//! Corrupted data (a pointer to a missing row, an accidental cycle) is
//! reported as a [`WalkIssue`] and terminates that branch of the walk; it is
//! never a hard error.

#![warn(unreachable_pub)]

pub mod ownership;
pub mod traversal;

// Re-exports for convenience
pub use ownership::{find_chain_owned_policy, OwnershipSearch, MAX_OWNERSHIP_HOPS};
pub use traversal::{cascade_set, collect_predecessors, collect_successors, CascadeSet, ChainWalk, WalkIssue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
