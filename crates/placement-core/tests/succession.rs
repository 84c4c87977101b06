//! End-to-end succession scenarios over the in-memory stores

use async_trait::async_trait;
use placement_core::{
    ContractLifecycleService, LifecycleError, NewContract, PlacementConfig, ReplacementTerms,
    SignatureError, SignatureGateway, SignatureStatus,
};
use placement_engine::{GatewayError, SyncDisposition};
use placement_model::{Contract, ContractId, ContractStatus, SyncOutcome, SyncStatus};
use placement_store::{ChainStore, MemoryChainStore, PolicyStore, SyncLogStore};
use placement_test_utils::{active_policy, sample_customer, sample_term, sample_worker, StoreEnv};
use std::sync::Arc;
use std::time::Duration;

/// Signature gateway answering a fixed status
struct FixedSignatureGateway(SignatureStatus);

#[async_trait]
impl SignatureGateway for FixedSignatureGateway {
    async fn contract_status(
        &self,
        _external_ref: &str,
    ) -> Result<SignatureStatus, SignatureError> {
        Ok(self.0)
    }
}

fn build_service(
    env: &StoreEnv,
    signature_status: SignatureStatus,
) -> ContractLifecycleService {
    let config = PlacementConfig::new().with_sync_workers(1);
    let engine = env.engine(config.engine_config());
    let queue = env.queue(engine.clone());
    ContractLifecycleService::new(
        env.chain.clone(),
        env.policies.clone(),
        engine,
        queue,
        Arc::new(FixedSignatureGateway(signature_status)),
        config,
    )
}

fn new_contract_input(phone: &str, worker_name: &str, worker_id: &str) -> NewContract {
    let (start, end) = sample_term();
    NewContract::new(
        sample_customer(phone),
        sample_worker(worker_name, worker_id),
        placement_model::ServiceKind::Nanny,
        start,
        end,
    )
}

/// Wait until background reconciliation has recorded a terminal outcome.
async fn wait_for_sync(chain: &MemoryChainStore, id: ContractId) -> Contract {
    for _ in 0..500 {
        let contract = chain.get(id).await.unwrap().expect("contract exists");
        let finished = !contract.sync.pending
            && matches!(contract.sync.status, Some(s) if s != SyncStatus::Pending);
        if finished {
            return contract;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("reconciliation did not finish for {id}");
}

#[tokio::test]
async fn worker_swap_migrates_the_policy() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    // First signing: worker 甲 already carries an active policy.
    env.policies
        .insert(active_policy("甲", "110101197001011234", "P1"))
        .await
        .unwrap();

    let a = service
        .create_contract(new_contract_input("13800000001", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();
    service.mark_active(a.id).await.unwrap();

    let a_synced = wait_for_sync(&env.chain, a.id).await;
    assert_eq!(a_synced.sync.status, Some(SyncStatus::Success));
    let bound = env.policies.find_by_contract(a.id).await.unwrap();
    assert_eq!(bound.len(), 1);
    let policy_id = bound[0].id;

    // Replacement: 乙 takes over, the policy follows.
    let b = service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap();
    assert_eq!(b.predecessor_id, Some(a.id));
    assert_eq!(b.customer.phone, "13800000001");
    assert_eq!(b.end_date, a.end_date);

    let a_after = env.chain.get(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.status, ContractStatus::Replaced);
    assert_eq!(a_after.successor_id, Some(b.id));
    assert!(!a_after.is_latest);

    service.begin_signing(b.id).await.unwrap();
    service.mark_active(b.id).await.unwrap();
    let b_synced = wait_for_sync(&env.chain, b.id).await;
    assert_eq!(b_synced.sync.status, Some(SyncStatus::Success));

    let policy = env.policies.get(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.contract_id, Some(b.id));
    assert_eq!(policy.insured.name, "乙");
    assert_eq!(policy.insured.id_number, "110101198001015678");

    let calls = env.gateway.amend_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].policy_number, "P1");
    assert_eq!(calls[0].old_insured, "甲");
    assert_eq!(calls[0].new_insured, "乙");

    let entries = env.sync_log.for_contract(b.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, SyncOutcome::Success);
    assert_eq!(entries[0].old_insured.name, "甲");
    assert_eq!(entries[0].new_insured.name, "乙");

    service.shutdown().await;
}

#[tokio::test]
async fn concurrent_replacement_conflicts() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000002", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();
    service.mark_active(a.id).await.unwrap();
    wait_for_sync(&env.chain, a.id).await;

    service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap();

    let err = service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("丙", "110101199001012345")),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    service.shutdown().await;
}

#[tokio::test]
async fn replacing_unknown_contract_is_not_found() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let err = service
        .replace_worker(
            ContractId::new(),
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    service.shutdown().await;
}

#[tokio::test]
async fn failed_sync_recovers_through_manual_resync() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000003", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();
    service.mark_active(a.id).await.unwrap();
    wait_for_sync(&env.chain, a.id).await;

    let mut policy = active_policy("甲", "110101197001011234", "P1");
    policy.bind_to(a.id);
    let policy_id = policy.id;
    env.policies.insert(policy).await.unwrap();

    // The insurer is down for the replacement sync.
    env.gateway
        .script_amend(Err(GatewayError::Unreachable("connection reset".to_string())));

    let b = service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap();
    service.begin_signing(b.id).await.unwrap();
    service.mark_active(b.id).await.unwrap();

    let b_failed = wait_for_sync(&env.chain, b.id).await;
    assert_eq!(b_failed.sync.status, Some(SyncStatus::Failed));
    assert!(!b_failed.sync.pending);
    assert!(b_failed.sync.error.unwrap().contains("connection reset"));

    // Binding untouched by the failed attempt.
    let policy = env.policies.get(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.contract_id, Some(a.id));

    // Operator retries; the fake gateway now answers with success.
    let report = service.manual_resync_insurance(b.id).await.unwrap();
    assert_eq!(report.disposition, SyncDisposition::Completed);

    let policy = env.policies.get(policy_id).await.unwrap().unwrap();
    assert_eq!(policy.contract_id, Some(b.id));
    assert_eq!(policy.insured.name, "乙");

    let b_after = env.chain.get(b.id).await.unwrap().unwrap();
    assert_eq!(b_after.sync.status, Some(SyncStatus::Success));

    service.shutdown().await;
}

#[tokio::test]
async fn manual_resync_requires_active_contract() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000004", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();

    let err = service.manual_resync_insurance(a.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotActive(_)));

    service.shutdown().await;
}

#[tokio::test]
async fn delete_chain_removes_every_link_and_unbinds_policies() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000005", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();
    service.mark_active(a.id).await.unwrap();
    wait_for_sync(&env.chain, a.id).await;

    let mut policy = active_policy("甲", "110101197001011234", "P1");
    policy.bind_to(a.id);
    let policy_id = policy.id;
    env.policies.insert(policy).await.unwrap();

    let b = service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap();

    // Deleting the successor takes the whole chain with it.
    let deletion = service.delete_chain(b.id).await.unwrap();
    assert_eq!(deletion.removed, 2);
    assert_eq!(deletion.unbound, 1);

    assert!(env.chain.get(a.id).await.unwrap().is_none());
    assert!(env.chain.get(b.id).await.unwrap().is_none());

    let policy = env.policies.get(policy_id).await.unwrap().unwrap();
    assert!(policy.contract_id.is_none());

    service.shutdown().await;
}

#[tokio::test]
async fn fully_signed_vendor_status_activates_and_syncs() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let input = new_contract_input("13800000006", "甲", "110101197001011234")
        .with_signing_ref("ESIGN-001");
    let a = service.create_contract(input).await.unwrap();
    assert_eq!(a.status, ContractStatus::Draft);

    let (updated, vendor_status) = service.sync_signature_status(a.id).await.unwrap();
    assert_eq!(vendor_status, SignatureStatus::FullySigned);
    assert_eq!(updated.status, ContractStatus::Active);

    let synced = wait_for_sync(&env.chain, a.id).await;
    assert_eq!(synced.sync.status, Some(SyncStatus::Success));

    service.shutdown().await;
}

#[tokio::test]
async fn revoked_vendor_status_cancels() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::Revoked);

    let input = new_contract_input("13800000007", "甲", "110101197001011234")
        .with_signing_ref("ESIGN-002");
    let a = service.create_contract(input).await.unwrap();

    let (updated, _) = service.sync_signature_status(a.id).await.unwrap();
    assert_eq!(updated.status, ContractStatus::Cancelled);

    service.shutdown().await;
}

#[tokio::test]
async fn signature_sync_without_reference_is_refused() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000008", "甲", "110101197001011234"))
        .await
        .unwrap();

    let err = service.sync_signature_status(a.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NoSigningRef(_)));

    service.shutdown().await;
}

#[tokio::test]
async fn history_walks_the_chain_newest_first() {
    let env = StoreEnv::new();
    let service = build_service(&env, SignatureStatus::FullySigned);

    let a = service
        .create_contract(new_contract_input("13800000009", "甲", "110101197001011234"))
        .await
        .unwrap();
    service.begin_signing(a.id).await.unwrap();
    service.mark_active(a.id).await.unwrap();
    wait_for_sync(&env.chain, a.id).await;

    let b = service
        .replace_worker(
            a.id,
            ReplacementTerms::new(sample_worker("乙", "110101198001015678")),
        )
        .await
        .unwrap();

    let current = service.current_contract("13800000009").await.unwrap().unwrap();
    assert_eq!(current.id, b.id);

    let history = service
        .contract_history("13800000009")
        .await
        .unwrap()
        .expect("history exists");
    assert_eq!(history.latest.id, b.id);
    assert_eq!(history.predecessors.len(), 1);
    assert_eq!(history.predecessors[0].id, a.id);
    assert!(history.issues.is_empty());

    assert!(service.contract_history("19900000000").await.unwrap().is_none());

    service.shutdown().await;
}
