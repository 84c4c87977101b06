//! Structured reconciliation outcomes
//!
//! Every run produces a [`SyncReport`] with one [`PolicyOutcome`] per policy
//! touched, so callers can act on partial failure programmatically instead
//! of parsing a concatenated message string.

use placement_model::{ContractId, PolicyId, SyncStatus};

/// What the engine tried to do with a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    /// First signing: bind an existing policy to the contract
    Bound,
    /// Worker replacement: re-target the policy to the new worker
    Migrated,
}

/// Result of one action against one policy
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    /// Policy acted on
    pub policy_id: PolicyId,
    /// External policy number at the time, if any
    pub policy_number: Option<String>,
    /// Action attempted
    pub action: PolicyAction,
    /// Whether the action stuck
    pub success: bool,
    /// Failure detail, when it did not
    pub message: Option<String>,
}

impl PolicyOutcome {
    /// Record a successful action
    #[inline]
    #[must_use]
    pub fn succeeded(
        policy_id: PolicyId,
        policy_number: Option<String>,
        action: PolicyAction,
    ) -> Self {
        Self {
            policy_id,
            policy_number,
            action,
            success: true,
            message: None,
        }
    }

    /// Record a failed action
    #[inline]
    #[must_use]
    pub fn failed(
        policy_id: PolicyId,
        policy_number: Option<String>,
        action: PolicyAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            policy_id,
            policy_number,
            action,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Overall disposition of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDisposition {
    /// The idempotency guard refused the run; nothing happened
    Skipped,
    /// No policy to bind or migrate; recorded as success
    NothingToDo,
    /// At least one policy action succeeded
    Completed,
    /// Every attempted policy action failed
    Failed,
}

/// Full result of one reconciliation run
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The activating contract
    pub contract_id: ContractId,
    /// Overall disposition
    pub disposition: SyncDisposition,
    /// Per-policy results, empty when nothing was attempted
    pub outcomes: Vec<PolicyOutcome>,
    /// Context note ("no policy to bind", internal error text, ...)
    pub note: Option<String>,
}

impl SyncReport {
    /// Run refused by the idempotency guard
    #[inline]
    #[must_use]
    pub fn skipped(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            disposition: SyncDisposition::Skipped,
            outcomes: Vec::new(),
            note: None,
        }
    }

    /// Run finished with nothing to act on
    #[inline]
    #[must_use]
    pub fn nothing_to_do(contract_id: ContractId, note: impl Into<String>) -> Self {
        Self {
            contract_id,
            disposition: SyncDisposition::NothingToDo,
            outcomes: Vec::new(),
            note: Some(note.into()),
        }
    }

    /// Run aborted by an internal error before any outcome was produced
    #[inline]
    #[must_use]
    pub fn failed_internal(contract_id: ContractId, note: impl Into<String>) -> Self {
        Self {
            contract_id,
            disposition: SyncDisposition::Failed,
            outcomes: Vec::new(),
            note: Some(note.into()),
        }
    }

    /// Derive the disposition from per-policy outcomes
    ///
    /// At least one success makes the run `Completed`; all failures make it
    /// `Failed`; no outcomes at all means `NothingToDo`.
    #[must_use]
    pub fn from_outcomes(contract_id: ContractId, outcomes: Vec<PolicyOutcome>) -> Self {
        let disposition = if outcomes.is_empty() {
            SyncDisposition::NothingToDo
        } else if outcomes.iter().any(|o| o.success) {
            SyncDisposition::Completed
        } else {
            SyncDisposition::Failed
        };
        Self {
            contract_id,
            disposition,
            outcomes,
            note: None,
        }
    }

    /// The sync status and error summary to persist on the contract
    #[must_use]
    pub fn stored_outcome(&self) -> (SyncStatus, Option<String>) {
        match self.disposition {
            SyncDisposition::Completed | SyncDisposition::NothingToDo | SyncDisposition::Skipped => {
                (SyncStatus::Success, None)
            }
            SyncDisposition::Failed => (SyncStatus::Failed, self.error_summary()),
        }
    }

    /// Short human summary of the failed outcomes
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        let failures: Vec<String> = self
            .outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| {
                format!(
                    "{}: {}",
                    o.policy_number.as_deref().unwrap_or("unissued"),
                    o.message.as_deref().unwrap_or("unknown failure")
                )
            })
            .collect();
        if failures.is_empty() {
            self.note.clone()
        } else {
            Some(failures.join("; "))
        }
    }

    /// Count of successful outcomes
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(action: PolicyAction) -> PolicyOutcome {
        PolicyOutcome::succeeded(PolicyId::new(), Some("P1".to_string()), action)
    }

    fn bad(action: PolicyAction) -> PolicyOutcome {
        PolicyOutcome::failed(PolicyId::new(), None, action, "issuer down")
    }

    #[test]
    fn disposition_from_outcomes() {
        let contract = ContractId::new();

        let report = SyncReport::from_outcomes(contract, vec![]);
        assert_eq!(report.disposition, SyncDisposition::NothingToDo);

        let report = SyncReport::from_outcomes(contract, vec![ok(PolicyAction::Bound)]);
        assert_eq!(report.disposition, SyncDisposition::Completed);

        let report = SyncReport::from_outcomes(
            contract,
            vec![ok(PolicyAction::Migrated), bad(PolicyAction::Migrated)],
        );
        assert_eq!(report.disposition, SyncDisposition::Completed);
        assert_eq!(report.succeeded(), 1);

        let report = SyncReport::from_outcomes(contract, vec![bad(PolicyAction::Migrated)]);
        assert_eq!(report.disposition, SyncDisposition::Failed);
    }

    #[test]
    fn stored_outcome_mapping() {
        let contract = ContractId::new();

        let (status, error) = SyncReport::nothing_to_do(contract, "no policy to bind")
            .stored_outcome();
        assert_eq!(status, placement_model::SyncStatus::Success);
        assert!(error.is_none());

        let (status, error) =
            SyncReport::from_outcomes(contract, vec![bad(PolicyAction::Bound)]).stored_outcome();
        assert_eq!(status, placement_model::SyncStatus::Failed);
        assert!(error.unwrap().contains("issuer down"));
    }

    #[test]
    fn error_summary_lists_each_failure() {
        let contract = ContractId::new();
        let report = SyncReport::from_outcomes(
            contract,
            vec![
                PolicyOutcome::failed(
                    PolicyId::new(),
                    Some("P1".to_string()),
                    PolicyAction::Migrated,
                    "timeout",
                ),
                PolicyOutcome::failed(PolicyId::new(), None, PolicyAction::Migrated, "rejected"),
            ],
        );
        let summary = report.error_summary().unwrap();
        assert!(summary.contains("P1: timeout"));
        assert!(summary.contains("unissued: rejected"));
    }
}
