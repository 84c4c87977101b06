//! Contract lifecycle service
//!
//! Orchestrates contract creation, worker replacement, activation and
//! deletion over the chain and policy stores. Activation is the trigger
//! point for insurance reconciliation: the write path dispatches to the
//! background queue and returns, it never waits on the insurer.

use crate::config::PlacementConfig;
use crate::error::LifecycleError;
use crate::signing::{SignatureGateway, SignatureStatus};
use chrono::{NaiveDate, Utc};
use placement_chain::{cascade_set, collect_predecessors, WalkIssue};
use placement_engine::{ReconciliationEngine, SyncQueue, SyncReport};
use placement_model::{
    generate_contract_number, Contract, ContractId, ContractStatus, CustomerIdentity, ServiceKind,
    WorkerIdentity,
};
use placement_store::{ChainStore, PolicyStore};
use std::sync::Arc;

/// Input for creating a fresh contract (a new chain)
#[derive(Debug, Clone)]
pub struct NewContract {
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
    /// E-signature vendor reference, when signing was already initiated
    pub signing_ref: Option<String>,
}

impl NewContract {
    /// Create new contract input
    #[must_use]
    pub fn new(
        customer: CustomerIdentity,
        worker: WorkerIdentity,
        service_kind: ServiceKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            customer,
            worker,
            service_kind,
            start_date,
            end_date,
            worker_salary: None,
            service_fee: None,
            remarks: None,
            signing_ref: None,
        }
    }

    /// With monthly worker salary (cents)
    #[inline]
    #[must_use]
    pub fn with_worker_salary(mut self, cents: u32) -> Self {
        self.worker_salary = Some(cents);
        self
    }

    /// With e-signature vendor reference
    #[inline]
    #[must_use]
    pub fn with_signing_ref(mut self, signing_ref: impl Into<String>) -> Self {
        self.signing_ref = Some(signing_ref.into());
        self
    }
}

/// Input for replacing the worker on an existing chain
///
/// Customer identity and service end date are inherited from the
/// predecessor; the service term does not reset on a worker change.
#[derive(Debug, Clone)]
pub struct ReplacementTerms {
    /// The incoming worker
    pub worker: WorkerIdentity,
    /// New service kind, inherited when `None`
    pub service_kind: Option<ServiceKind>,
    /// Monthly worker salary in cents
    pub worker_salary: Option<u32>,
    /// Agency service fee in cents
    pub service_fee: Option<u32>,
    /// Free-form remarks
    pub remarks: Option<String>,
    /// E-signature vendor reference
    pub signing_ref: Option<String>,
}

impl ReplacementTerms {
    /// Create replacement input for a new worker
    #[must_use]
    pub fn new(worker: WorkerIdentity) -> Self {
        Self {
            worker,
            service_kind: None,
            worker_salary: None,
            service_fee: None,
            remarks: None,
            signing_ref: None,
        }
    }

    /// With monthly worker salary (cents)
    #[inline]
    #[must_use]
    pub fn with_worker_salary(mut self, cents: u32) -> Self {
        self.worker_salary = Some(cents);
        self
    }

    /// With remarks
    #[inline]
    #[must_use]
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// Result of a cascading chain delete
#[derive(Debug, Clone, Copy)]
pub struct ChainDeletion {
    /// Contracts removed
    pub removed: usize,
    /// Policies whose contract binding was cleared
    pub unbound: usize,
}

/// A customer's contract history: the chain from newest to oldest
#[derive(Debug, Clone)]
pub struct ChainHistory {
    /// Current chain head
    pub latest: Contract,
    /// Predecessors, newest to oldest
    pub predecessors: Vec<Contract>,
    /// Integrity issues seen while walking
    pub issues: Vec<WalkIssue>,
}

/// The contract lifecycle service
pub struct ContractLifecycleService {
    chain: Arc<dyn ChainStore>,
    policies: Arc<dyn PolicyStore>,
    engine: Arc<ReconciliationEngine>,
    queue: Arc<SyncQueue>,
    signatures: Arc<dyn SignatureGateway>,
    config: PlacementConfig,
}

impl ContractLifecycleService {
    /// Create the service over its collaborators
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainStore>,
        policies: Arc<dyn PolicyStore>,
        engine: Arc<ReconciliationEngine>,
        queue: Arc<SyncQueue>,
        signatures: Arc<dyn SignatureGateway>,
        config: PlacementConfig,
    ) -> Self {
        Self {
            chain,
            policies,
            engine,
            queue,
            signatures,
            config,
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Create a fresh contract, opening a new chain for the customer
    ///
    /// # Errors
    /// - `Conflict` if the customer already has a live chain head
    pub async fn create_contract(&self, input: NewContract) -> Result<Contract, LifecycleError> {
        let mut contract = Contract::new(
            generate_contract_number(),
            input.customer,
            input.worker,
            input.service_kind,
            input.start_date,
            input.end_date,
        );
        contract.worker_salary = input.worker_salary;
        contract.service_fee = input.service_fee;
        contract.remarks = input.remarks;
        contract.signing_ref = input.signing_ref;

        self.chain.insert(contract.clone()).await?;
        tracing::info!(
            contract = %contract.id,
            number = %contract.contract_number,
            customer = %contract.customer.phone,
            "contract created"
        );
        Ok(contract)
    }

    /// Replace the worker on a chain, creating and linking the successor
    ///
    /// The new contract inherits the customer identity and the service end
    /// date from the predecessor; its start date is today. Both sides of the
    /// link are committed as one unit by the store.
    ///
    /// # Errors
    /// - `ContractNotFound` if the predecessor does not exist
    /// - `Conflict` if the predecessor was already replaced (concurrent
    ///   replacement loses)
    pub async fn replace_worker(
        &self,
        predecessor_id: ContractId,
        terms: ReplacementTerms,
    ) -> Result<Contract, LifecycleError> {
        let predecessor = self
            .chain
            .get(predecessor_id)
            .await?
            .ok_or(LifecycleError::ContractNotFound(predecessor_id))?;

        let mut successor = Contract::new(
            generate_contract_number(),
            predecessor.customer.clone(),
            terms.worker,
            terms.service_kind.unwrap_or(predecessor.service_kind),
            Utc::now().date_naive(),
            predecessor.end_date,
        )
        .replacing(predecessor_id);
        successor.worker_salary = terms.worker_salary.or(predecessor.worker_salary);
        successor.service_fee = terms.service_fee.or(predecessor.service_fee);
        successor.remarks = terms.remarks;
        successor.signing_ref = terms.signing_ref;

        let linked = self.chain.link_successor(predecessor_id, successor).await?;
        tracing::info!(
            predecessor = %predecessor_id,
            successor = %linked.id,
            worker = %linked.worker.name,
            "worker replaced"
        );
        Ok(linked)
    }

    /// Move a contract into signing
    ///
    /// # Errors
    /// - `InvalidTransition` unless the contract is a draft
    pub async fn begin_signing(&self, id: ContractId) -> Result<Contract, LifecycleError> {
        Ok(self.chain.set_status(id, ContractStatus::Signing).await?)
    }

    /// Cancel a contract
    ///
    /// # Errors
    /// - `InvalidTransition` if the contract is already terminal
    pub async fn cancel(&self, id: ContractId) -> Result<Contract, LifecycleError> {
        let contract = self.chain.set_status(id, ContractStatus::Cancelled).await?;
        tracing::info!(contract = %id, "contract cancelled");
        Ok(contract)
    }

    /// Activate a fully signed contract and schedule insurance reconciliation
    ///
    /// The contract becomes active immediately; reconciliation runs in the
    /// background and its progress is only observable through the contract's
    /// sync bookkeeping. A saturated queue is logged and left for manual
    /// resync, it never fails the activation.
    ///
    /// # Errors
    /// - `InvalidTransition` unless the contract is in signing
    pub async fn mark_active(&self, id: ContractId) -> Result<Contract, LifecycleError> {
        let contract = self.chain.set_status(id, ContractStatus::Active).await?;
        tracing::info!(contract = %id, "contract active");

        if let Err(err) = self.queue.dispatch(id) {
            tracing::warn!(
                contract = %id,
                error = %err,
                "insurance sync not scheduled, awaiting manual resync"
            );
        }
        Ok(contract)
    }

    /// Poll the e-signature vendor and move the contract along
    ///
    /// Fully signed drives activation (the sole coupling point to the
    /// signing vendor); revocation cancels; partial progress moves a draft
    /// into signing.
    ///
    /// # Errors
    /// - `NoSigningRef` if signing was never initiated for the contract
    /// - `SignatureGateway` if the vendor cannot be queried
    pub async fn sync_signature_status(
        &self,
        id: ContractId,
    ) -> Result<(Contract, SignatureStatus), LifecycleError> {
        let contract = self
            .chain
            .get(id)
            .await?
            .ok_or(LifecycleError::ContractNotFound(id))?;
        let signing_ref = contract
            .signing_ref
            .clone()
            .ok_or(LifecycleError::NoSigningRef(id))?;

        let status = self
            .signatures
            .contract_status(&signing_ref)
            .await
            .map_err(|e| LifecycleError::SignatureGateway(e.to_string()))?;

        let updated = match status {
            SignatureStatus::FullySigned => {
                let mut current = contract;
                if current.status == ContractStatus::Draft {
                    current = self.begin_signing(id).await?;
                }
                if current.status == ContractStatus::Signing {
                    current = self.mark_active(id).await?;
                }
                current
            }
            SignatureStatus::PartiallySigned if contract.status == ContractStatus::Draft => {
                self.begin_signing(id).await?
            }
            SignatureStatus::Revoked if !contract.status.is_terminal() => {
                self.cancel(id).await?
            }
            _ => contract,
        };

        tracing::debug!(contract = %id, vendor_status = ?status, "signature status synced");
        Ok((updated, status))
    }

    /// Delete a contract together with its whole chain
    ///
    /// The only supported deletion path: removing a single mid-chain row
    /// would orphan its neighbours. Policy bindings onto any removed
    /// contract are cleared so no dangling references remain.
    ///
    /// # Errors
    /// - `ContractNotFound` if the target does not exist
    pub async fn delete_chain(&self, id: ContractId) -> Result<ChainDeletion, LifecycleError> {
        let set = cascade_set(self.chain.as_ref(), id).await?;
        for issue in &set.issues {
            tracing::warn!(contract = %id, ?issue, "chain issue found during delete");
        }

        let removed = self.chain.remove_batch(&set.ids).await?;
        let unbound = self.policies.clear_contract_bindings(&set.ids).await?;

        tracing::info!(contract = %id, removed, unbound, "chain deleted");
        Ok(ChainDeletion { removed, unbound })
    }

    /// Operator-triggered insurance resync
    ///
    /// Clears the sync bookkeeping (the deliberate idempotency reset) and
    /// re-runs reconciliation inline, returning the report.
    ///
    /// # Errors
    /// - `ContractNotFound` if the contract does not exist
    /// - `NotActive` unless the contract is active
    pub async fn manual_resync_insurance(
        &self,
        id: ContractId,
    ) -> Result<SyncReport, LifecycleError> {
        let contract = self
            .chain
            .get(id)
            .await?
            .ok_or(LifecycleError::ContractNotFound(id))?;
        if contract.status != ContractStatus::Active {
            return Err(LifecycleError::NotActive(id));
        }

        self.chain.reset_sync(id).await?;
        tracing::info!(contract = %id, "manual insurance resync");
        Ok(self.engine.on_contract_active(id).await?)
    }

    /// A customer's current contract, if any
    pub async fn current_contract(
        &self,
        customer_phone: &str,
    ) -> Result<Option<Contract>, LifecycleError> {
        Ok(self.chain.latest_for_customer(customer_phone).await?)
    }

    /// A customer's full contract history, newest first
    pub async fn contract_history(
        &self,
        customer_phone: &str,
    ) -> Result<Option<ChainHistory>, LifecycleError> {
        let Some(latest) = self.chain.latest_for_customer(customer_phone).await? else {
            return Ok(None);
        };
        let walk = collect_predecessors(self.chain.as_ref(), latest.id).await?;
        Ok(Some(ChainHistory {
            latest,
            predecessors: walk.contracts,
            issues: walk.issues,
        }))
    }

    /// Shut down the background sync queue, draining in-flight work
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
