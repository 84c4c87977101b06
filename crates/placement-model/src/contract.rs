//! Contract records
//!
//! A contract binds one customer to one worker for a service term. Worker
//! replacement never edits a contract in place: it creates a successor row
//! and links the two through `predecessor_id`/`successor_id`, forming the
//! succession chain. Exactly one contract per chain carries
//! `is_latest == true`.

use crate::identity::{CustomerIdentity, WorkerIdentity};
use crate::ids::ContractId;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kind of placement service covered by a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Hourly housekeeping
    Hourly,
    /// Live-in nanny / childcare
    Nanny,
    /// Maternity nurse
    MaternityNurse,
}

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Created, not yet sent for signing
    Draft,
    /// Signing in progress
    Signing,
    /// Fully signed and in force
    Active,
    /// Superseded by a successor contract (terminal)
    Replaced,
    /// Cancelled before completion (terminal)
    Cancelled,
}

impl ContractStatus {
    /// Check whether this status is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replaced | Self::Cancelled)
    }

    /// Check whether a transition to `next` is allowed
    ///
    /// Allowed moves: `Draft -> Signing -> Active`, `Active -> Replaced`,
    /// and any non-terminal status `-> Cancelled`.
    #[must_use]
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        match (self, next) {
            (Self::Draft, Self::Signing) => true,
            (Self::Signing, Self::Active) => true,
            (Self::Active, Self::Replaced) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Insurance synchronization status recorded on a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Reconciliation started, outcome not yet recorded
    Pending,
    /// Reconciliation finished; at least one policy handled (or nothing to do)
    Success,
    /// Reconciliation finished; every attempted policy failed
    Failed,
}

/// Insurance sync bookkeeping embedded in a contract
///
/// `status == None` means reconciliation has never been attempted. `pending`
/// is the in-flight guard: while set, no second reconciliation may start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBookkeeping {
    /// Last recorded outcome, `None` until first attempt
    pub status: Option<SyncStatus>,
    /// Short human-readable failure summary
    pub error: Option<String>,
    /// When the last attempt finished
    pub synced_at: Option<DateTime<Utc>>,
    /// In-flight guard flag
    pub pending: bool,
}

impl SyncBookkeeping {
    /// Check whether the idempotency guard refuses a new attempt
    ///
    /// Guarded when a previous attempt succeeded or one is still in flight.
    #[inline]
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.pending || self.status == Some(SyncStatus::Success)
    }

    /// Reset to the never-attempted state (manual resync entry point)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Contract record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Record id
    pub id: ContractId,
    /// Human-facing contract number, unique
    pub contract_number: String,
    /// Customer party
    pub customer: CustomerIdentity,
    /// Worker party
    pub worker: WorkerIdentity,
    /// Service kind
    pub service_kind: ServiceKind,
    /// Service term start
    pub start_date: NaiveDate,
    /// Service term end
    pub end_date: NaiveDate,
    /// Monthly worker salary in cents
    pub worker_salary: Option<u32>,
    /// Agency service fee in cents
    pub service_fee: Option<u32>,
    /// Free-form remarks
    pub remarks: Option<String>,
    /// Reference into the e-signature vendor, when signing was initiated
    pub signing_ref: Option<String>,
    /// Lifecycle status
    pub status: ContractStatus,
    /// Contract this one replaces
    pub predecessor_id: Option<ContractId>,
    /// Contract that replaced this one
    pub successor_id: Option<ContractId>,
    /// Chain head marker: true on exactly one contract per chain
    pub is_latest: bool,
    /// Insurance sync bookkeeping
    pub sync: SyncBookkeeping,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Create a new draft contract at the head of a fresh chain
    #[must_use]
    pub fn new(
        contract_number: impl Into<String>,
        customer: CustomerIdentity,
        worker: WorkerIdentity,
        service_kind: ServiceKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: ContractId::new(),
            contract_number: contract_number.into(),
            customer,
            worker,
            service_kind,
            start_date,
            end_date,
            worker_salary: None,
            service_fee: None,
            remarks: None,
            signing_ref: None,
            status: ContractStatus::Draft,
            predecessor_id: None,
            successor_id: None,
            is_latest: true,
            sync: SyncBookkeeping::default(),
            created_at: Utc::now(),
        }
    }

    /// With monthly worker salary (cents)
    #[inline]
    #[must_use]
    pub fn with_worker_salary(mut self, cents: u32) -> Self {
        self.worker_salary = Some(cents);
        self
    }

    /// With agency service fee (cents)
    #[inline]
    #[must_use]
    pub fn with_service_fee(mut self, cents: u32) -> Self {
        self.service_fee = Some(cents);
        self
    }

    /// With remarks
    #[inline]
    #[must_use]
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// With e-signature vendor reference
    #[inline]
    #[must_use]
    pub fn with_signing_ref(mut self, signing_ref: impl Into<String>) -> Self {
        self.signing_ref = Some(signing_ref.into());
        self
    }

    /// Mark as the successor of `predecessor`
    #[inline]
    #[must_use]
    pub fn replacing(mut self, predecessor: ContractId) -> Self {
        self.predecessor_id = Some(predecessor);
        self
    }

    /// Check whether this contract opened a fresh chain
    #[inline]
    #[must_use]
    pub fn is_first_signing(&self) -> bool {
        self.predecessor_id.is_none()
    }
}

/// Generate a contract number: `CON` + second-resolution timestamp tail +
/// three random digits
#[must_use]
pub fn generate_contract_number() -> String {
    let tail = Utc::now().timestamp_millis() % 100_000_000;
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!("CON{tail:08}{suffix:03}")
}
