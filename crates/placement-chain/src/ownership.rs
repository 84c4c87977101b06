//! Policy ownership search
//!
//! Answers "which policy does this chain own?" for a contract that is
//! replacing a predecessor. The walk goes backwards one hop at a time; at
//! each hop the contract binding is consulted first (the authoritative
//! ownership record) and the insured-identity lookup second (older policies
//! predate the binding field). The search is bounded so a pathological chain
//! always terminates.

use placement_model::{Contract, ContractId, InsurancePolicy};
use placement_store::{ChainStore, PolicyStore, StoreError};
use std::collections::HashSet;

/// Maximum number of predecessor hops inspected by the ownership search
pub const MAX_OWNERSHIP_HOPS: usize = 10;

/// Outcome of a policy ownership search
#[derive(Debug, Clone)]
pub enum OwnershipSearch {
    /// A hop owned one or more policies
    Found {
        /// The policies owned at that hop
        policies: Vec<InsurancePolicy>,
        /// The contract hop that owned them
        owner: Contract,
        /// 1-based hop distance from the starting contract
        hops: usize,
    },
    /// No hop owned a policy
    NotFound {
        /// Hops actually inspected
        hops: usize,
        /// True when the hop bound stopped the walk before the chain ended
        truncated: bool,
    },
}

impl OwnershipSearch {
    /// Check whether the search found anything
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Search the predecessor chain of `start` for the policies it owns
///
/// Stops at the first hop where any policy is found, after
/// [`MAX_OWNERSHIP_HOPS`] hops, or when the chain ends. A dangling pointer
/// or cycle ends the walk as if the chain ended there.
///
/// # Errors
/// - `ContractNotFound` if `start` does not exist
pub async fn find_chain_owned_policy(
    chain: &dyn ChainStore,
    policies: &dyn PolicyStore,
    start: ContractId,
) -> Result<OwnershipSearch, StoreError> {
    let origin = chain
        .get(start)
        .await?
        .ok_or(StoreError::ContractNotFound(start))?;

    let mut visited: HashSet<ContractId> = HashSet::new();
    visited.insert(start);

    let mut cursor = origin;
    let mut hops = 0;

    while let Some(prev_id) = cursor.predecessor_id {
        if hops == MAX_OWNERSHIP_HOPS {
            tracing::warn!(
                start = %start,
                hops,
                "ownership search stopped at hop bound"
            );
            return Ok(OwnershipSearch::NotFound {
                hops,
                truncated: true,
            });
        }
        if !visited.insert(prev_id) {
            tracing::warn!(contract = %prev_id, "cycle during ownership search");
            break;
        }

        let Some(hop) = chain.get(prev_id).await? else {
            tracing::warn!(
                from = %cursor.id,
                missing = %prev_id,
                "ownership search hit a missing contract"
            );
            break;
        };
        hops += 1;

        // Binding first: the authoritative ownership record.
        let bound = policies.find_by_contract(hop.id).await?;
        if !bound.is_empty() {
            return Ok(OwnershipSearch::Found {
                policies: bound,
                owner: hop,
                hops,
            });
        }

        // Identity fallback for records that predate the binding field.
        let by_identity = policies
            .find_active_by_insured_id_number(&hop.worker.id_number)
            .await?;
        if !by_identity.is_empty() {
            return Ok(OwnershipSearch::Found {
                policies: by_identity,
                owner: hop,
                hops,
            });
        }

        cursor = hop;
    }

    Ok(OwnershipSearch::NotFound {
        hops,
        truncated: false,
    })
}
