//! Storage port traits
//!
//! Async seams between the business layers and persistence. Implementations
//! must make every method atomic with respect to the fields it touches: a
//! caller never observes a half-written succession link or a torn sync flag.

use crate::error::StoreError;
use async_trait::async_trait;
use placement_model::{
    Contract, ContractId, ContractStatus, InsurancePolicy, PolicyId, SyncLogEntry, SyncStatus,
};

/// Contract chain persistence
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Insert a new contract
    ///
    /// # Errors
    /// - `Conflict` on a duplicate contract number, or when the customer
    ///   already has a live chain head
    async fn insert(&self, contract: Contract) -> Result<(), StoreError>;

    /// Fetch a contract by id
    async fn get(&self, id: ContractId) -> Result<Option<Contract>, StoreError>;

    /// Fetch a contract by its human-facing number
    async fn get_by_number(&self, number: &str) -> Result<Option<Contract>, StoreError>;

    /// Current chain head for a customer phone, if any
    async fn latest_for_customer(&self, phone: &str) -> Result<Option<Contract>, StoreError>;

    /// Link `successor` into the chain behind `predecessor`, atomically
    ///
    /// In one logical write: inserts the successor row with its
    /// `predecessor_id` set, and updates the predecessor to
    /// `{ successor_id, is_latest = false, status = Replaced }`. Either both
    /// sides commit or neither does.
    ///
    /// # Errors
    /// - `ContractNotFound` if the predecessor does not exist
    /// - `Conflict` if the predecessor was already replaced (a successor is
    ///   set or it is no longer the chain head)
    /// - `InvalidTransition` if the predecessor cannot move to `Replaced`
    async fn link_successor(
        &self,
        predecessor: ContractId,
        successor: Contract,
    ) -> Result<Contract, StoreError>;

    /// Update a contract's lifecycle status
    ///
    /// # Errors
    /// - `InvalidTransition` if the state machine forbids the move
    async fn set_status(
        &self,
        id: ContractId,
        status: ContractStatus,
    ) -> Result<Contract, StoreError>;

    /// Conditionally claim the sync guard for a contract
    ///
    /// Atomic compare-and-swap: returns `Ok(false)` without any write when a
    /// previous reconciliation succeeded or one is still in flight; otherwise
    /// marks the contract `{ pending: true, status: Pending }` and returns
    /// `Ok(true)`. Two concurrent callers can never both observe `true`.
    async fn try_begin_sync(&self, id: ContractId) -> Result<bool, StoreError>;

    /// Record the terminal outcome of a reconciliation attempt
    ///
    /// Clears the in-flight flag and stamps status, error and finish time.
    async fn finish_sync(
        &self,
        id: ContractId,
        status: SyncStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Reset sync bookkeeping to the never-attempted state
    ///
    /// The manual-resync idempotency reset, distinct from the normal guard.
    async fn reset_sync(&self, id: ContractId) -> Result<(), StoreError>;

    /// Remove a batch of contracts in one logical write
    ///
    /// Returns the number of rows removed. Missing ids are skipped.
    async fn remove_batch(&self, ids: &[ContractId]) -> Result<usize, StoreError>;
}

/// Insurance policy persistence
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Insert a new policy record
    ///
    /// # Errors
    /// - `Conflict` on a duplicate agency reference
    async fn insert(&self, policy: InsurancePolicy) -> Result<(), StoreError>;

    /// Fetch a policy by id
    async fn get(&self, id: PolicyId) -> Result<Option<InsurancePolicy>, StoreError>;

    /// Replace a policy row
    ///
    /// # Errors
    /// - `PolicyNotFound` if the row does not exist
    async fn update(&self, policy: InsurancePolicy) -> Result<(), StoreError>;

    /// Policies currently bound to a contract
    async fn find_by_contract(&self, id: ContractId) -> Result<Vec<InsurancePolicy>, StoreError>;

    /// Active policies whose insured id number matches
    ///
    /// The compatibility fallback for records that predate the contract
    /// binding field.
    async fn find_active_by_insured_id_number(
        &self,
        id_number: &str,
    ) -> Result<Vec<InsurancePolicy>, StoreError>;

    /// Fetch a policy by agency reference
    async fn find_by_agency_ref(
        &self,
        agency_ref: &str,
    ) -> Result<Option<InsurancePolicy>, StoreError>;

    /// Fetch a policy by external policy number
    async fn find_by_policy_number(
        &self,
        number: &str,
    ) -> Result<Option<InsurancePolicy>, StoreError>;

    /// Clear contract bindings referencing any of the given contracts
    ///
    /// Used by cascading chain delete so no dangling foreign keys remain.
    /// Returns the number of policies unbound.
    async fn clear_contract_bindings(&self, ids: &[ContractId]) -> Result<usize, StoreError>;
}

/// Append-only reconciliation audit trail
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Append one attempt record
    async fn append(&self, entry: SyncLogEntry) -> Result<(), StoreError>;

    /// All attempts recorded for a contract, oldest first
    async fn for_contract(&self, id: ContractId) -> Result<Vec<SyncLogEntry>, StoreError>;
}
