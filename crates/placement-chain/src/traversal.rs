//! Chain walks and cascade sets
//!
//! All walks are iterative over an explicit visited set. The walk result
//! carries any integrity issues encountered; callers decide whether a
//! truncated walk matters for them.

use placement_model::{Contract, ContractId};
use placement_store::{ChainStore, StoreError};
use std::collections::HashSet;

/// Integrity issue encountered during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkIssue {
    /// A pointer led back to an already-visited contract
    CycleDetected(ContractId),
    /// A pointer target does not exist in the store
    MissingLink {
        /// Contract holding the dangling pointer
        from: ContractId,
        /// The missing target
        missing: ContractId,
    },
}

/// Result of walking one direction of a chain
#[derive(Debug, Clone, Default)]
pub struct ChainWalk {
    /// Contracts in walk order, excluding the starting contract
    pub contracts: Vec<Contract>,
    /// Integrity issues encountered; empty on a healthy chain
    pub issues: Vec<WalkIssue>,
}

impl ChainWalk {
    /// Check whether the walk saw a healthy chain
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Ids of the walked contracts, in walk order
    #[must_use]
    pub fn ids(&self) -> Vec<ContractId> {
        self.contracts.iter().map(|c| c.id).collect()
    }
}

/// Walk `predecessor_id` pointers from `start` until the chain ends
///
/// Returns the predecessors ordered newest to oldest, excluding `start`
/// itself. A dangling pointer or a cycle terminates the walk with a recorded
/// issue instead of failing.
///
/// # Errors
/// - `ContractNotFound` if `start` itself does not exist
pub async fn collect_predecessors(
    store: &dyn ChainStore,
    start: ContractId,
) -> Result<ChainWalk, StoreError> {
    walk(store, start, |c| c.predecessor_id).await
}

/// Walk `successor_id` pointers from `start` until the chain ends
///
/// Symmetric to [`collect_predecessors`]: oldest to newest, excluding
/// `start` itself.
///
/// # Errors
/// - `ContractNotFound` if `start` itself does not exist
pub async fn collect_successors(
    store: &dyn ChainStore,
    start: ContractId,
) -> Result<ChainWalk, StoreError> {
    walk(store, start, |c| c.successor_id).await
}

async fn walk(
    store: &dyn ChainStore,
    start: ContractId,
    next_of: impl Fn(&Contract) -> Option<ContractId>,
) -> Result<ChainWalk, StoreError> {
    let origin = store
        .get(start)
        .await?
        .ok_or(StoreError::ContractNotFound(start))?;

    let mut visited: HashSet<ContractId> = HashSet::new();
    visited.insert(start);

    let mut result = ChainWalk::default();
    let mut cursor = origin;

    while let Some(next_id) = next_of(&cursor) {
        if !visited.insert(next_id) {
            tracing::warn!(contract = %next_id, "cycle detected in succession chain");
            result.issues.push(WalkIssue::CycleDetected(next_id));
            break;
        }
        match store.get(next_id).await? {
            Some(next) => {
                result.contracts.push(next.clone());
                cursor = next;
            }
            None => {
                tracing::warn!(
                    from = %cursor.id,
                    missing = %next_id,
                    "succession pointer targets a missing contract"
                );
                result.issues.push(WalkIssue::MissingLink {
                    from: cursor.id,
                    missing: next_id,
                });
                break;
            }
        }
    }

    Ok(result)
}

/// The full set of contracts that must be deleted together with `target`
#[derive(Debug, Clone)]
pub struct CascadeSet {
    /// Every contract in the chain, including `target`; no duplicates
    pub ids: Vec<ContractId>,
    /// Issues from either direction of the walk
    pub issues: Vec<WalkIssue>,
}

impl CascadeSet {
    /// Number of contracts in the set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// A cascade set always contains at least the target
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Compute the cascade set for deleting `target`
///
/// Union of the predecessor walk, the successor walk and the target itself.
/// A contract mid-chain cannot be removed alone without breaking traversal,
/// so deletion always operates on this whole set.
///
/// # Errors
/// - `ContractNotFound` if `target` does not exist
pub async fn cascade_set(
    store: &dyn ChainStore,
    target: ContractId,
) -> Result<CascadeSet, StoreError> {
    let predecessors = collect_predecessors(store, target).await?;
    let successors = collect_successors(store, target).await?;

    let mut seen: HashSet<ContractId> = HashSet::new();
    let mut ids = Vec::new();
    for id in predecessors
        .ids()
        .into_iter()
        .chain(std::iter::once(target))
        .chain(successors.ids())
    {
        if seen.insert(id) {
            ids.push(id);
        }
    }

    let mut issues = predecessors.issues;
    issues.extend(successors.issues);

    Ok(CascadeSet { ids, issues })
}
