//! Sync audit entries
//!
//! Append-only record of every insurance reconciliation attempt: who was
//! insured before, who after, against which policy, and how the external
//! call went. Entries are never mutated after insert.

use crate::ids::{ContractId, PolicyId, SyncLogId};
use crate::policy::InsuredPerson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single reconciliation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// External call succeeded and local state was updated
    Success,
    /// External call failed or local update was refused
    Failed,
}

/// One reconciliation attempt against one policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    /// Entry id
    pub id: SyncLogId,
    /// Contract that triggered the attempt (the activating successor)
    pub contract_id: ContractId,
    /// Policy the attempt targeted
    pub policy_id: PolicyId,
    /// External policy number at attempt time
    pub policy_number: Option<String>,
    /// Insured person before the attempt
    pub old_insured: InsuredPerson,
    /// Insured person after the attempt (the incoming worker)
    pub new_insured: InsuredPerson,
    /// Attempt outcome
    pub outcome: SyncOutcome,
    /// Failure message, when failed
    pub message: Option<String>,
    /// Raw gateway response, when captured
    pub gateway_response: Option<String>,
    /// When the attempt was recorded
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Record a successful attempt
    #[must_use]
    pub fn success(
        contract_id: ContractId,
        policy_id: PolicyId,
        policy_number: Option<String>,
        old_insured: InsuredPerson,
        new_insured: InsuredPerson,
    ) -> Self {
        Self {
            id: SyncLogId::new(),
            contract_id,
            policy_id,
            policy_number,
            old_insured,
            new_insured,
            outcome: SyncOutcome::Success,
            message: None,
            gateway_response: None,
            created_at: Utc::now(),
        }
    }

    /// Record a failed attempt
    #[must_use]
    pub fn failure(
        contract_id: ContractId,
        policy_id: PolicyId,
        policy_number: Option<String>,
        old_insured: InsuredPerson,
        new_insured: InsuredPerson,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: SyncLogId::new(),
            contract_id,
            policy_id,
            policy_number,
            old_insured,
            new_insured,
            outcome: SyncOutcome::Failed,
            message: Some(message.into()),
            gateway_response: None,
            created_at: Utc::now(),
        }
    }

    /// With the raw gateway response attached
    #[inline]
    #[must_use]
    pub fn with_gateway_response(mut self, response: impl Into<String>) -> Self {
        self.gateway_response = Some(response.into());
        self
    }
}
