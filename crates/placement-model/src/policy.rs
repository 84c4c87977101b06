//! Insurance policy records
//!
//! A policy is issued externally and tracked locally. The `contract_id`
//! binding records which contract currently owns the policy; after a worker
//! replacement the binding moves to the successor contract, it is never
//! duplicated.

use crate::ids::{ContractId, PolicyId};
use chrono::{DateTime, NaiveDate, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Primary insured person on a policy (exactly one per policy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuredPerson {
    /// Insured name
    pub name: String,
    /// National id number (the matching key against contract workers)
    pub id_number: String,
    /// Mobile phone, when known
    pub phone: Option<String>,
}

impl InsuredPerson {
    /// Create new insured person
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, id_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_number: id_number.into(),
            phone: None,
        }
    }

    /// With phone
    #[inline]
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

impl From<&crate::identity::WorkerIdentity> for InsuredPerson {
    fn from(worker: &crate::identity::WorkerIdentity) -> Self {
        Self {
            name: worker.name.clone(),
            id_number: worker.id_number.clone(),
            phone: Some(worker.phone.clone()),
        }
    }
}

/// Policy status as reported by the issuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyStatus {
    /// Purchase confirmed, payment outstanding
    Pending,
    /// Issuer processing
    Processing,
    /// In force
    Active,
    /// Term ended
    Expired,
    /// Voided by the issuer
    Cancelled,
    /// Surrendered before term end
    Surrendered,
}

/// Insurance policy record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    /// Record id
    pub id: PolicyId,
    /// Internal agency reference, unique, present from creation
    pub agency_ref: String,
    /// External policy number, set once the issuer confirms
    pub policy_number: Option<String>,
    /// Primary insured person
    pub insured: InsuredPerson,
    /// Issuer plan code
    pub plan_code: String,
    /// Coverage start
    pub effective_date: NaiveDate,
    /// Coverage end
    pub expire_date: NaiveDate,
    /// Issuer-reported status
    pub status: PolicyStatus,
    /// Contract currently owning this policy
    pub contract_id: Option<ContractId>,
    /// When the current binding was made
    pub bound_at: Option<DateTime<Utc>>,
    /// Issuer-reported error, if any
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl InsurancePolicy {
    /// Create a new unbound policy record awaiting issuer confirmation
    #[must_use]
    pub fn new(
        insured: InsuredPerson,
        plan_code: impl Into<String>,
        effective_date: NaiveDate,
        expire_date: NaiveDate,
    ) -> Self {
        Self {
            id: PolicyId::new(),
            agency_ref: generate_agency_ref(),
            policy_number: None,
            insured,
            plan_code: plan_code.into(),
            effective_date,
            expire_date,
            status: PolicyStatus::Pending,
            contract_id: None,
            bound_at: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Bind this policy to a contract, replacing any previous binding
    pub fn bind_to(&mut self, contract: ContractId) {
        self.contract_id = Some(contract);
        self.bound_at = Some(Utc::now());
    }

    /// Clear the contract binding (contract chain deleted)
    pub fn unbind(&mut self) {
        self.contract_id = None;
        self.bound_at = None;
    }
}

/// Generate an agency reference: `AGY` + millisecond timestamp + six random
/// alphanumerics
#[must_use]
pub fn generate_agency_ref() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("AGY{}{}", Utc::now().timestamp_millis(), suffix)
}
