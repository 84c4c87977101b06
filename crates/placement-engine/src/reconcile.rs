//! Reconciliation engine
//!
//! Entry point is [`ReconciliationEngine::on_contract_active`], invoked once
//! per status transition into active. Idempotency of the call is the
//! lifecycle service's job; idempotency of the effect is enforced here
//! through the store's conditional sync-guard write: a run only proceeds
//! after it has claimed the guard, so retried triggers, webhook replays and
//! manual re-invocations cannot double-bind or double-migrate a policy.

use crate::gateway::{GatewayError, InsuranceGateway};
use crate::report::{PolicyAction, PolicyOutcome, SyncReport};
use placement_chain::{find_chain_owned_policy, OwnershipSearch};
use placement_model::{Contract, ContractId, InsuredPerson, PolicyId, SyncLogEntry};
use placement_store::{ChainStore, PolicyStore, StoreError, SyncLogStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for each external insurer call
    pub gateway_timeout: Duration,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With gateway timeout
    #[inline]
    #[must_use]
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(30),
        }
    }
}

/// Reconciliation failure visible to direct callers
///
/// Only pre-guard lookups surface here; once a run has claimed the guard,
/// failures are converted into a recorded sync outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Referenced contract does not exist
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Referenced policy does not exist
    #[error("policy not found: {0}")]
    PolicyNotFound(PolicyId),

    /// Storage failure
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// External insurer failure
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// The reconciliation engine
pub struct ReconciliationEngine {
    chain: Arc<dyn ChainStore>,
    policies: Arc<dyn PolicyStore>,
    sync_log: Arc<dyn SyncLogStore>,
    gateway: Arc<dyn InsuranceGateway>,
    config: EngineConfig,
}

impl ReconciliationEngine {
    /// Create a new engine over the given stores and gateway
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainStore>,
        policies: Arc<dyn PolicyStore>,
        sync_log: Arc<dyn SyncLogStore>,
        gateway: Arc<dyn InsuranceGateway>,
        config: EngineConfig,
    ) -> Self {
        Self {
            chain,
            policies,
            sync_log,
            gateway,
            config,
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile insurance for a contract that just became active
    ///
    /// # Workflow
    /// 1. Claim the sync guard (conditional store write); bail out as
    ///    `Skipped` if a prior run succeeded or one is in flight
    /// 2. First signing: bind active policies matching the worker identity
    /// 3. Worker replacement: locate the chain-owned policy and re-target it
    ///    through the insurer, moving the binding to this contract
    /// 4. Record the outcome on the contract and in the audit trail
    ///
    /// # Errors
    /// - `ContractNotFound` if the contract does not exist
    /// - `Store` only for failures before the guard is claimed or while
    ///   recording the final outcome
    pub async fn on_contract_active(&self, id: ContractId) -> Result<SyncReport, ReconcileError> {
        let contract = self
            .chain
            .get(id)
            .await?
            .ok_or(ReconcileError::ContractNotFound(id))?;

        if !self.chain.try_begin_sync(id).await? {
            tracing::debug!(contract = %id, "reconciliation refused by idempotency guard");
            return Ok(SyncReport::skipped(id));
        }

        let report = match self.run(&contract).await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(contract = %id, error = %err, "reconciliation aborted");
                SyncReport::failed_internal(id, err.to_string())
            }
        };

        let (status, error) = report.stored_outcome();
        self.chain.finish_sync(id, status, error).await?;

        tracing::info!(
            contract = %id,
            disposition = ?report.disposition,
            policies = report.outcomes.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn run(&self, contract: &Contract) -> Result<SyncReport, ReconcileError> {
        if contract.is_first_signing() {
            self.bind_first_signing(contract).await
        } else {
            self.migrate_from_chain(contract).await
        }
    }

    /// First signing: adopt existing policies already covering this worker
    async fn bind_first_signing(&self, contract: &Contract) -> Result<SyncReport, ReconcileError> {
        let candidates = self
            .policies
            .find_active_by_insured_id_number(&contract.worker.id_number)
            .await?;

        if candidates.is_empty() {
            // Most workers have no policy yet; this is not an error.
            return Ok(SyncReport::nothing_to_do(contract.id, "no policy to bind"));
        }

        let mut outcomes = Vec::with_capacity(candidates.len());
        for mut policy in candidates {
            let policy_id = policy.id;
            let number = policy.policy_number.clone();
            policy.bind_to(contract.id);
            let outcome = match self.policies.update(policy).await {
                Ok(()) => PolicyOutcome::succeeded(policy_id, number, PolicyAction::Bound),
                Err(err) => {
                    PolicyOutcome::failed(policy_id, number, PolicyAction::Bound, err.to_string())
                }
            };
            outcomes.push(outcome);
        }
        Ok(SyncReport::from_outcomes(contract.id, outcomes))
    }

    /// Worker replacement: move the chain-owned policy to the new worker
    async fn migrate_from_chain(&self, contract: &Contract) -> Result<SyncReport, ReconcileError> {
        let search =
            find_chain_owned_policy(self.chain.as_ref(), self.policies.as_ref(), contract.id)
                .await?;

        let OwnershipSearch::Found {
            policies,
            owner,
            hops,
        } = search
        else {
            return Ok(SyncReport::nothing_to_do(
                contract.id,
                "no policy owned by the chain",
            ));
        };

        tracing::debug!(
            contract = %contract.id,
            owner = %owner.id,
            hops,
            policies = policies.len(),
            "migrating chain-owned policies"
        );

        let new_insured = InsuredPerson::from(&contract.worker);
        let mut outcomes = Vec::with_capacity(policies.len());

        for policy in policies {
            let outcome = self
                .migrate_one(contract, policy, &new_insured)
                .await?;
            outcomes.push(outcome);
        }
        Ok(SyncReport::from_outcomes(contract.id, outcomes))
    }

    /// Amend one policy through the insurer and move its binding
    async fn migrate_one(
        &self,
        contract: &Contract,
        mut policy: placement_model::InsurancePolicy,
        new_insured: &InsuredPerson,
    ) -> Result<PolicyOutcome, ReconcileError> {
        let policy_id = policy.id;
        let number = policy.policy_number.clone();
        let old_insured = policy.insured.clone();

        let amended = match &number {
            None => Err("policy has no external number yet".to_string()),
            Some(policy_no) => self
                .with_timeout(self.gateway.amend_insured_person(
                    policy_no,
                    &old_insured,
                    new_insured,
                ))
                .await
                .map_err(|e| e.to_string()),
        };

        let outcome = match amended {
            Ok(receipt) => {
                // Ownership migration: the policy now insures the incoming
                // worker and belongs to the activating contract.
                policy.insured = new_insured.clone();
                policy.bind_to(contract.id);
                match self.policies.update(policy).await {
                    Ok(()) => {
                        let mut entry = SyncLogEntry::success(
                            contract.id,
                            policy_id,
                            number.clone(),
                            old_insured.clone(),
                            new_insured.clone(),
                        );
                        if let Some(raw) = receipt.raw_response {
                            entry = entry.with_gateway_response(raw);
                        }
                        self.sync_log.append(entry).await?;
                        PolicyOutcome::succeeded(policy_id, number, PolicyAction::Migrated)
                    }
                    Err(err) => {
                        let message = format!("binding update failed: {err}");
                        self.sync_log
                            .append(SyncLogEntry::failure(
                                contract.id,
                                policy_id,
                                number.clone(),
                                old_insured.clone(),
                                new_insured.clone(),
                                message.clone(),
                            ))
                            .await?;
                        PolicyOutcome::failed(policy_id, number, PolicyAction::Migrated, message)
                    }
                }
            }
            Err(message) => {
                tracing::warn!(
                    contract = %contract.id,
                    policy = %policy_id,
                    error = %message,
                    "insured-person amendment failed"
                );
                self.sync_log
                    .append(SyncLogEntry::failure(
                        contract.id,
                        policy_id,
                        number.clone(),
                        old_insured,
                        new_insured.clone(),
                        message.clone(),
                    ))
                    .await?;
                PolicyOutcome::failed(policy_id, number, PolicyAction::Migrated, message)
            }
        };
        Ok(outcome)
    }

    /// Audit entries recorded for a contract
    ///
    /// # Errors
    /// Returns storage failures as-is.
    pub async fn sync_history(
        &self,
        id: ContractId,
    ) -> Result<Vec<SyncLogEntry>, ReconcileError> {
        Ok(self.sync_log.for_contract(id).await?)
    }

    pub(crate) fn gateway_ref(&self) -> &dyn InsuranceGateway {
        self.gateway.as_ref()
    }

    pub(crate) fn policies_ref(&self) -> &dyn PolicyStore {
        self.policies.as_ref()
    }

    pub(crate) async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.gateway_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AmendReceipt, MockInsuranceGateway, PlanTerms, PolicyIssue, PolicyRef};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use placement_model::{
        generate_contract_number, ContractStatus, CustomerIdentity, InsurancePolicy, PolicyStatus,
        ServiceKind, SyncOutcome, SyncStatus, WorkerIdentity,
    };
    use placement_store::{MemoryChainStore, MemoryPolicyStore, MemorySyncLog};

    struct Env {
        chain: Arc<MemoryChainStore>,
        policies: Arc<MemoryPolicyStore>,
        sync_log: Arc<MemorySyncLog>,
    }

    impl Env {
        fn new() -> Self {
            Self {
                chain: Arc::new(MemoryChainStore::new()),
                policies: Arc::new(MemoryPolicyStore::new()),
                sync_log: Arc::new(MemorySyncLog::new()),
            }
        }

        fn engine(&self, gateway: Arc<dyn InsuranceGateway>) -> ReconciliationEngine {
            ReconciliationEngine::new(
                self.chain.clone(),
                self.policies.clone(),
                self.sync_log.clone(),
                gateway,
                EngineConfig::new(),
            )
        }
    }

    fn contract(worker_name: &str, worker_id: &str) -> Contract {
        Contract::new(
            generate_contract_number(),
            CustomerIdentity::new("客户", "13800000001"),
            WorkerIdentity::new(worker_name, "13900000000", worker_id),
            ServiceKind::Nanny,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    fn active_policy(worker_name: &str, worker_id: &str, number: &str) -> InsurancePolicy {
        let mut p = InsurancePolicy::new(
            InsuredPerson::new(worker_name, worker_id),
            "PLAN-A",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        p.status = PolicyStatus::Active;
        p.policy_number = Some(number.to_string());
        p
    }

    async fn insert_active(env: &Env, contract: Contract) -> Contract {
        let id = contract.id;
        env.chain.insert(contract).await.unwrap();
        env.chain
            .set_status(id, ContractStatus::Signing)
            .await
            .unwrap();
        env.chain
            .set_status(id, ContractStatus::Active)
            .await
            .unwrap()
    }

    async fn replace_active(env: &Env, predecessor: ContractId, next: Contract) -> Contract {
        let linked = env.chain.link_successor(predecessor, next).await.unwrap();
        env.chain
            .set_status(linked.id, ContractStatus::Signing)
            .await
            .unwrap();
        env.chain
            .set_status(linked.id, ContractStatus::Active)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn first_signing_binds_matching_policy() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;
        env.policies
            .insert(active_policy("甲", "110101197001011234", "P1"))
            .await
            .unwrap();

        let engine = env.engine(Arc::new(MockInsuranceGateway::new()));
        let report = engine.on_contract_active(first.id).await.unwrap();

        assert_eq!(report.disposition, crate::SyncDisposition::Completed);
        let bound = env.policies.find_by_contract(first.id).await.unwrap();
        assert_eq!(bound.len(), 1);

        let stored = env.chain.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, Some(SyncStatus::Success));
        assert!(!stored.sync.pending);
    }

    #[tokio::test]
    async fn first_signing_without_policy_is_success() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;

        let engine = env.engine(Arc::new(MockInsuranceGateway::new()));
        let report = engine.on_contract_active(first.id).await.unwrap();

        assert_eq!(report.disposition, crate::SyncDisposition::NothingToDo);
        assert_eq!(report.note.as_deref(), Some("no policy to bind"));

        let stored = env.chain.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, Some(SyncStatus::Success));
    }

    #[tokio::test]
    async fn replacement_migrates_policy_to_new_worker() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;

        let mut p1 = active_policy("甲", "110101197001011234", "P1");
        p1.bind_to(first.id);
        let policy_id = p1.id;
        env.policies.insert(p1).await.unwrap();

        let second = replace_active(&env, first.id, contract("乙", "110101198001015678")).await;

        let mut gateway = MockInsuranceGateway::new();
        gateway
            .expect_amend_insured_person()
            .withf(|number, old, new| {
                number == "P1" && old.name == "甲" && new.name == "乙"
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(AmendReceipt {
                    raw_response: Some("<Result>ok</Result>".to_string()),
                })
            });

        let engine = env.engine(Arc::new(gateway));
        let report = engine.on_contract_active(second.id).await.unwrap();
        assert_eq!(report.disposition, crate::SyncDisposition::Completed);

        let migrated = env.policies.get(policy_id).await.unwrap().unwrap();
        assert_eq!(migrated.contract_id, Some(second.id));
        assert_eq!(migrated.insured.name, "乙");
        assert_eq!(migrated.insured.id_number, "110101198001015678");

        let entries = env.sync_log.for_contract(second.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, SyncOutcome::Success);
        assert_eq!(entries[0].old_insured.name, "甲");
        assert_eq!(entries[0].new_insured.name, "乙");
    }

    #[tokio::test]
    async fn replacement_without_chain_policy_is_noop() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;
        let second = replace_active(&env, first.id, contract("乙", "110101198001015678")).await;

        let engine = env.engine(Arc::new(MockInsuranceGateway::new()));
        let report = engine.on_contract_active(second.id).await.unwrap();

        assert_eq!(report.disposition, crate::SyncDisposition::NothingToDo);
        let stored = env.chain.get(second.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, Some(SyncStatus::Success));
    }

    #[tokio::test]
    async fn gateway_rejection_records_failure_and_keeps_binding() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;

        let mut p1 = active_policy("甲", "110101197001011234", "P1");
        p1.bind_to(first.id);
        let policy_id = p1.id;
        env.policies.insert(p1).await.unwrap();

        let second = replace_active(&env, first.id, contract("乙", "110101198001015678")).await;

        let mut gateway = MockInsuranceGateway::new();
        gateway
            .expect_amend_insured_person()
            .times(1)
            .returning(|_, _, _| Err(GatewayError::Rejected("id mismatch".to_string())));

        let engine = env.engine(Arc::new(gateway));
        let report = engine.on_contract_active(second.id).await.unwrap();
        assert_eq!(report.disposition, crate::SyncDisposition::Failed);

        // Binding unchanged, failure recorded, guard released.
        let policy = env.policies.get(policy_id).await.unwrap().unwrap();
        assert_eq!(policy.contract_id, Some(first.id));
        assert_eq!(policy.insured.name, "甲");

        let stored = env.chain.get(second.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, Some(SyncStatus::Failed));
        assert!(!stored.sync.pending);
        assert!(stored.sync.error.unwrap().contains("id mismatch"));

        let entries = env.sync_log.for_contract(second.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, SyncOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_timeout_is_a_recorded_failure() {
        struct SlowGateway;

        #[async_trait]
        impl InsuranceGateway for SlowGateway {
            async fn issue_policy(
                &self,
                _insured: &InsuredPerson,
                _terms: &PlanTerms,
            ) -> Result<PolicyIssue, GatewayError> {
                unreachable!("not used")
            }

            async fn query_policy_status(
                &self,
                _policy: &PolicyRef,
            ) -> Result<PolicyStatus, GatewayError> {
                unreachable!("not used")
            }

            async fn amend_insured_person(
                &self,
                _policy_number: &str,
                _old: &InsuredPerson,
                _new: &InsuredPerson,
            ) -> Result<AmendReceipt, GatewayError> {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Ok(AmendReceipt::default())
            }
        }

        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;

        let mut p1 = active_policy("甲", "110101197001011234", "P1");
        p1.bind_to(first.id);
        let policy_id = p1.id;
        env.policies.insert(p1).await.unwrap();

        let second = replace_active(&env, first.id, contract("乙", "110101198001015678")).await;

        let engine = env.engine(Arc::new(SlowGateway));
        let report = engine.on_contract_active(second.id).await.unwrap();
        assert_eq!(report.disposition, crate::SyncDisposition::Failed);

        let stored = env.chain.get(second.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, Some(SyncStatus::Failed));
        assert!(!stored.sync.pending);
        assert!(stored.sync.error.unwrap().contains("timed out"));

        let policy = env.policies.get(policy_id).await.unwrap().unwrap();
        assert_eq!(policy.contract_id, Some(first.id));
    }

    #[tokio::test]
    async fn second_run_is_skipped_after_success() {
        let env = Env::new();
        let first = insert_active(&env, contract("甲", "110101197001011234")).await;

        let mut p1 = active_policy("甲", "110101197001011234", "P1");
        p1.bind_to(first.id);
        env.policies.insert(p1).await.unwrap();

        let second = replace_active(&env, first.id, contract("乙", "110101198001015678")).await;

        let mut gateway = MockInsuranceGateway::new();
        gateway
            .expect_amend_insured_person()
            .times(1)
            .returning(|_, _, _| Ok(AmendReceipt::default()));

        let engine = env.engine(Arc::new(gateway));
        let first_report = engine.on_contract_active(second.id).await.unwrap();
        assert_eq!(first_report.disposition, crate::SyncDisposition::Completed);

        let second_report = engine.on_contract_active(second.id).await.unwrap();
        assert_eq!(second_report.disposition, crate::SyncDisposition::Skipped);

        // No duplicate audit rows, binding still single.
        let entries = engine.sync_history(second.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        let bound = env.policies.find_by_contract(second.id).await.unwrap();
        assert_eq!(bound.len(), 1);
    }

    #[tokio::test]
    async fn ownership_follows_the_chain_end_to_end() {
        // A -> B -> C: the policy bound to A ends up on C after two
        // replacements, never bound to two contracts at once.
        let env = Env::new();
        let a = insert_active(&env, contract("甲", "110101197001011234")).await;

        let mut p1 = active_policy("甲", "110101197001011234", "P1");
        p1.bind_to(a.id);
        let policy_id = p1.id;
        env.policies.insert(p1).await.unwrap();

        let mut gateway = MockInsuranceGateway::new();
        gateway
            .expect_amend_insured_person()
            .times(2)
            .returning(|_, _, _| Ok(AmendReceipt::default()));
        let engine = env.engine(Arc::new(gateway));

        let b = replace_active(&env, a.id, contract("乙", "110101198001015678")).await;
        engine.on_contract_active(b.id).await.unwrap();
        let policy = env.policies.get(policy_id).await.unwrap().unwrap();
        assert_eq!(policy.contract_id, Some(b.id));

        let c = replace_active(&env, b.id, contract("丙", "110101199001012345")).await;
        engine.on_contract_active(c.id).await.unwrap();
        let policy = env.policies.get(policy_id).await.unwrap().unwrap();
        assert_eq!(policy.contract_id, Some(c.id));
        assert_eq!(policy.insured.name, "丙");

        // Exactly one contract owns the policy.
        for id in [a.id, b.id] {
            assert!(env.policies.find_by_contract(id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_contract_is_not_found() {
        let env = Env::new();
        let engine = env.engine(Arc::new(MockInsuranceGateway::new()));
        let err = engine
            .on_contract_active(ContractId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ContractNotFound(_)));
    }
}
