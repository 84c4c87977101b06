//! Error types for storage operations

use placement_model::{ContractId, ContractStatus};

/// Storage error
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Referenced contract does not exist
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Referenced policy does not exist
    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    /// Write would violate a chain or uniqueness invariant
    #[error("conflict: {0}")]
    Conflict(String),

    /// Status transition not allowed by the contract state machine
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status
        from: ContractStatus,
        /// Requested status
        to: ContractStatus,
    },
}

impl StoreError {
    /// Check if the error is a not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ContractNotFound(_) | Self::PolicyNotFound(_))
    }

    /// Check if the error is a conflict (non-retryable without new input)
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let not_found = StoreError::ContractNotFound(ContractId::new());
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = StoreError::Conflict("already replaced".to_string());
        assert!(conflict.is_conflict());

        let transition = StoreError::InvalidTransition {
            from: ContractStatus::Draft,
            to: ContractStatus::Replaced,
        };
        assert!(transition.is_conflict());
    }

    #[test]
    fn display_messages() {
        let err = StoreError::Conflict("second successor".to_string());
        assert!(err.to_string().contains("conflict"));
    }
}
