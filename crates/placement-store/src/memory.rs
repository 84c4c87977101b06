//! In-memory store implementations
//!
//! The contract map sits behind a single `RwLock` so multi-row operations
//! (succession linking, batch delete) run in one critical section. Policies
//! and audit entries are independent rows and use sharded maps.

use crate::error::StoreError;
use crate::traits::{ChainStore, PolicyStore, SyncLogStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use placement_model::{
    Contract, ContractId, ContractStatus, InsurancePolicy, PolicyId, PolicyStatus, SyncLogEntry,
    SyncStatus,
};
use std::collections::HashMap;

/// In-memory contract chain store
#[derive(Debug, Default)]
pub struct MemoryChainStore {
    contracts: RwLock<HashMap<ContractId, Contract>>,
}

impl MemoryChainStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contracts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn insert(&self, contract: Contract) -> Result<(), StoreError> {
        let mut contracts = self.contracts.write();

        if contracts
            .values()
            .any(|c| c.contract_number == contract.contract_number)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate contract number {}",
                contract.contract_number
            )));
        }

        // One live chain head per customer phone.
        if contract.is_latest
            && contracts.values().any(|c| {
                c.customer.phone == contract.customer.phone
                    && c.is_latest
                    && c.status != ContractStatus::Cancelled
            })
        {
            return Err(StoreError::Conflict(format!(
                "customer {} already has a live chain head",
                contract.customer.phone
            )));
        }

        contracts.insert(contract.id, contract);
        Ok(())
    }

    async fn get(&self, id: ContractId) -> Result<Option<Contract>, StoreError> {
        Ok(self.contracts.read().get(&id).cloned())
    }

    async fn get_by_number(&self, number: &str) -> Result<Option<Contract>, StoreError> {
        Ok(self
            .contracts
            .read()
            .values()
            .find(|c| c.contract_number == number)
            .cloned())
    }

    async fn latest_for_customer(&self, phone: &str) -> Result<Option<Contract>, StoreError> {
        Ok(self
            .contracts
            .read()
            .values()
            .find(|c| {
                c.customer.phone == phone
                    && c.is_latest
                    && c.status != ContractStatus::Cancelled
            })
            .cloned())
    }

    async fn link_successor(
        &self,
        predecessor: ContractId,
        mut successor: Contract,
    ) -> Result<Contract, StoreError> {
        let mut contracts = self.contracts.write();

        let pred = contracts
            .get(&predecessor)
            .ok_or(StoreError::ContractNotFound(predecessor))?;

        if pred.successor_id.is_some() || !pred.is_latest {
            return Err(StoreError::Conflict(format!(
                "contract {} was already replaced",
                pred.contract_number
            )));
        }
        if !pred.status.can_transition_to(ContractStatus::Replaced) {
            return Err(StoreError::InvalidTransition {
                from: pred.status,
                to: ContractStatus::Replaced,
            });
        }
        if contracts
            .values()
            .any(|c| c.contract_number == successor.contract_number)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate contract number {}",
                successor.contract_number
            )));
        }

        successor.predecessor_id = Some(predecessor);
        successor.is_latest = true;
        let successor_id = successor.id;

        contracts.insert(successor_id, successor.clone());
        let pred = contracts
            .get_mut(&predecessor)
            .ok_or(StoreError::ContractNotFound(predecessor))?;
        pred.successor_id = Some(successor_id);
        pred.is_latest = false;
        pred.status = ContractStatus::Replaced;

        tracing::debug!(
            predecessor = %predecessor,
            successor = %successor_id,
            "succession link committed"
        );
        Ok(successor)
    }

    async fn set_status(
        &self,
        id: ContractId,
        status: ContractStatus,
    ) -> Result<Contract, StoreError> {
        let mut contracts = self.contracts.write();
        let contract = contracts
            .get_mut(&id)
            .ok_or(StoreError::ContractNotFound(id))?;

        if !contract.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: contract.status,
                to: status,
            });
        }
        contract.status = status;
        Ok(contract.clone())
    }

    async fn try_begin_sync(&self, id: ContractId) -> Result<bool, StoreError> {
        let mut contracts = self.contracts.write();
        let contract = contracts
            .get_mut(&id)
            .ok_or(StoreError::ContractNotFound(id))?;

        if contract.sync.is_guarded() {
            return Ok(false);
        }
        contract.sync.pending = true;
        contract.sync.status = Some(SyncStatus::Pending);
        Ok(true)
    }

    async fn finish_sync(
        &self,
        id: ContractId,
        status: SyncStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut contracts = self.contracts.write();
        let contract = contracts
            .get_mut(&id)
            .ok_or(StoreError::ContractNotFound(id))?;

        contract.sync.pending = false;
        contract.sync.status = Some(status);
        contract.sync.error = error;
        contract.sync.synced_at = Some(Utc::now());
        Ok(())
    }

    async fn reset_sync(&self, id: ContractId) -> Result<(), StoreError> {
        let mut contracts = self.contracts.write();
        let contract = contracts
            .get_mut(&id)
            .ok_or(StoreError::ContractNotFound(id))?;
        contract.sync.reset();
        Ok(())
    }

    async fn remove_batch(&self, ids: &[ContractId]) -> Result<usize, StoreError> {
        let mut contracts = self.contracts.write();
        let mut removed = 0;
        for id in ids {
            if contracts.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-memory insurance policy store
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: DashMap<PolicyId, InsurancePolicy>,
}

impl MemoryPolicyStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored policies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn insert(&self, policy: InsurancePolicy) -> Result<(), StoreError> {
        if self
            .policies
            .iter()
            .any(|p| p.agency_ref == policy.agency_ref)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate agency reference {}",
                policy.agency_ref
            )));
        }
        self.policies.insert(policy.id, policy);
        Ok(())
    }

    async fn get(&self, id: PolicyId) -> Result<Option<InsurancePolicy>, StoreError> {
        Ok(self.policies.get(&id).map(|p| p.clone()))
    }

    async fn update(&self, policy: InsurancePolicy) -> Result<(), StoreError> {
        match self.policies.get_mut(&policy.id) {
            Some(mut row) => {
                *row = policy;
                Ok(())
            }
            None => Err(StoreError::PolicyNotFound(policy.id.to_string())),
        }
    }

    async fn find_by_contract(&self, id: ContractId) -> Result<Vec<InsurancePolicy>, StoreError> {
        Ok(self
            .policies
            .iter()
            .filter(|p| p.contract_id == Some(id))
            .map(|p| p.clone())
            .collect())
    }

    async fn find_active_by_insured_id_number(
        &self,
        id_number: &str,
    ) -> Result<Vec<InsurancePolicy>, StoreError> {
        Ok(self
            .policies
            .iter()
            .filter(|p| p.insured.id_number == id_number && p.status == PolicyStatus::Active)
            .map(|p| p.clone())
            .collect())
    }

    async fn find_by_agency_ref(
        &self,
        agency_ref: &str,
    ) -> Result<Option<InsurancePolicy>, StoreError> {
        Ok(self
            .policies
            .iter()
            .find(|p| p.agency_ref == agency_ref)
            .map(|p| p.clone()))
    }

    async fn find_by_policy_number(
        &self,
        number: &str,
    ) -> Result<Option<InsurancePolicy>, StoreError> {
        Ok(self
            .policies
            .iter()
            .find(|p| p.policy_number.as_deref() == Some(number))
            .map(|p| p.clone()))
    }

    async fn clear_contract_bindings(&self, ids: &[ContractId]) -> Result<usize, StoreError> {
        let mut cleared = 0;
        for mut entry in self.policies.iter_mut() {
            if let Some(bound) = entry.contract_id {
                if ids.contains(&bound) {
                    entry.unbind();
                    cleared += 1;
                }
            }
        }
        Ok(cleared)
    }
}

/// In-memory append-only sync audit trail
#[derive(Debug, Default)]
pub struct MemorySyncLog {
    entries: RwLock<Vec<SyncLogEntry>>,
}

impl MemorySyncLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded attempts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the log is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SyncLogStore for MemorySyncLog {
    async fn append(&self, entry: SyncLogEntry) -> Result<(), StoreError> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn for_contract(&self, id: ContractId) -> Result<Vec<SyncLogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.contract_id == id)
            .cloned()
            .collect())
    }
}
