//! Testing utilities for the placement workspace
//!
//! Shared fixtures, a scripted insurance gateway and store environment setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use placement_engine::{
    AmendReceipt, EngineConfig, GatewayError, InsuranceGateway, PlanTerms, PolicyIssue, PolicyRef,
    ReconciliationEngine, SyncQueue,
};
use placement_model::{
    generate_contract_number, Contract, CustomerIdentity, InsurancePolicy, InsuredPerson,
    PolicyStatus, ServiceKind, WorkerIdentity,
};
use placement_store::{MemoryChainStore, MemoryPolicyStore, MemorySyncLog};
use std::collections::VecDeque;
use std::sync::Arc;

pub fn sample_customer(phone: &str) -> CustomerIdentity {
    CustomerIdentity::new("测试客户", phone)
}

pub fn sample_worker(name: &str, id_number: &str) -> WorkerIdentity {
    WorkerIdentity::new(name, "13900000000", id_number)
}

pub fn sample_term() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
}

pub fn draft_contract(customer_phone: &str, worker_name: &str, worker_id: &str) -> Contract {
    let (start, end) = sample_term();
    Contract::new(
        generate_contract_number(),
        sample_customer(customer_phone),
        sample_worker(worker_name, worker_id),
        ServiceKind::Nanny,
        start,
        end,
    )
}

pub fn active_policy(worker_name: &str, worker_id: &str, number: &str) -> InsurancePolicy {
    let (start, end) = sample_term();
    let mut policy = InsurancePolicy::new(
        InsuredPerson::new(worker_name, worker_id),
        "PLAN-A",
        start,
        end,
    );
    policy.status = PolicyStatus::Active;
    policy.policy_number = Some(number.to_string());
    policy
}

/// Scripted insurance gateway
///
/// Pops queued results per operation; an empty queue answers with a generic
/// success. Records every amend call for assertions.
#[derive(Default)]
pub struct FakeInsuranceGateway {
    amend_results: Mutex<VecDeque<Result<AmendReceipt, GatewayError>>>,
    issue_results: Mutex<VecDeque<Result<PolicyIssue, GatewayError>>>,
    query_results: Mutex<VecDeque<Result<PolicyStatus, GatewayError>>>,
    amend_calls: Mutex<Vec<AmendCall>>,
}

#[derive(Debug, Clone)]
pub struct AmendCall {
    pub policy_number: String,
    pub old_insured: String,
    pub new_insured: String,
}

impl FakeInsuranceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_amend(&self, result: Result<AmendReceipt, GatewayError>) {
        self.amend_results.lock().push_back(result);
    }

    pub fn script_issue(&self, result: Result<PolicyIssue, GatewayError>) {
        self.issue_results.lock().push_back(result);
    }

    pub fn script_query(&self, result: Result<PolicyStatus, GatewayError>) {
        self.query_results.lock().push_back(result);
    }

    pub fn amend_calls(&self) -> Vec<AmendCall> {
        self.amend_calls.lock().clone()
    }
}

#[async_trait]
impl InsuranceGateway for FakeInsuranceGateway {
    async fn issue_policy(
        &self,
        _insured: &InsuredPerson,
        _terms: &PlanTerms,
    ) -> Result<PolicyIssue, GatewayError> {
        self.issue_results.lock().pop_front().unwrap_or(Ok(PolicyIssue {
            policy_number: Some("P-FAKE".to_string()),
            status: PolicyStatus::Processing,
            raw_response: None,
        }))
    }

    async fn query_policy_status(
        &self,
        _policy: &PolicyRef,
    ) -> Result<PolicyStatus, GatewayError> {
        self.query_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(PolicyStatus::Active))
    }

    async fn amend_insured_person(
        &self,
        policy_number: &str,
        old: &InsuredPerson,
        new: &InsuredPerson,
    ) -> Result<AmendReceipt, GatewayError> {
        self.amend_calls.lock().push(AmendCall {
            policy_number: policy_number.to_string(),
            old_insured: old.name.clone(),
            new_insured: new.name.clone(),
        });
        self.amend_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(AmendReceipt::default()))
    }
}

/// Fresh in-memory store environment
pub struct StoreEnv {
    pub chain: Arc<MemoryChainStore>,
    pub policies: Arc<MemoryPolicyStore>,
    pub sync_log: Arc<MemorySyncLog>,
    pub gateway: Arc<FakeInsuranceGateway>,
}

impl StoreEnv {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(MemoryChainStore::new()),
            policies: Arc::new(MemoryPolicyStore::new()),
            sync_log: Arc::new(MemorySyncLog::new()),
            gateway: Arc::new(FakeInsuranceGateway::new()),
        }
    }

    pub fn engine(&self, config: EngineConfig) -> Arc<ReconciliationEngine> {
        Arc::new(ReconciliationEngine::new(
            self.chain.clone(),
            self.policies.clone(),
            self.sync_log.clone(),
            self.gateway.clone(),
            config,
        ))
    }

    pub fn queue(&self, engine: Arc<ReconciliationEngine>) -> Arc<SyncQueue> {
        Arc::new(SyncQueue::start(engine, 16, 1))
    }
}

impl Default for StoreEnv {
    fn default() -> Self {
        Self::new()
    }
}
