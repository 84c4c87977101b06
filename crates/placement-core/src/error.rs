//! Error types for the lifecycle service
//!
//! The caller-visible taxonomy: not-found and conflict are surfaced directly
//! (non-retryable without new input), storage and reconciliation failures
//! keep their source, and signature vendor failures are tagged.

use placement_engine::ReconcileError;
use placement_model::{ContractId, ContractStatus};
use placement_store::StoreError;

/// Lifecycle operation failure
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Referenced contract does not exist
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Operation would violate the chain invariant
    #[error("chain conflict: {0}")]
    Conflict(String),

    /// Status transition not allowed by the contract state machine
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status
        from: ContractStatus,
        /// Requested status
        to: ContractStatus,
    },

    /// Operation requires an active contract
    #[error("contract {0} is not active")]
    NotActive(ContractId),

    /// Contract has no e-signature reference to query
    #[error("contract {0} has no signing reference")]
    NoSigningRef(ContractId),

    /// Other storage failure
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Reconciliation failure from a manual resync
    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// E-signature vendor failure
    #[error("signature gateway failure: {0}")]
    SignatureGateway(String),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ContractNotFound(id) => Self::ContractNotFound(id),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Store(other),
        }
    }
}

impl LifecycleError {
    /// Check if the error is a not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContractNotFound(_))
    }

    /// Check if the error is a conflict with the chain invariant
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidTransition { .. })
    }
}
