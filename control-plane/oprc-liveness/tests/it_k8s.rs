// Integration tests that expect a running k8s cluster with the NodeClaim and
// NodePool CRDs applied (`cargo run --bin crdgen | kubectl apply -f -`).
// Enable via: cargo test -p oprc-liveness --test it_k8s -- --ignored

use std::sync::Arc;
use std::time::Duration;

use kube::{
    Client,
    api::{Api, DeleteParams, Patch, PatchParams, PostParams},
};
use oprc_liveness::controller::{
    Liveness, Outcome, clock::FakeClock, store::KubeStore,
    timeout::TimeoutPolicies,
};
use oprc_liveness::crd::{
    conditions::{ConditionStatus, StatusConditions},
    node_claim::{CONDITION_LAUNCHED, CONDITION_REGISTERED, NodeClaim},
    node_pool::{CONDITION_NODE_REGISTRATION_HEALTHY, NodePool},
};
use serde_json::json;

mod common;
use common::{RecordingSink, cond, node_claim, node_pool, t0, uniq};

async fn create_with_status<K>(api: &Api<K>, obj: &K) -> K
where
    K: kube::Resource
        + Clone
        + serde::Serialize
        + serde::de::DeserializeOwned
        + std::fmt::Debug
        + StatusConditions,
{
    let name = obj.meta().name.clone().expect("name");
    api.create(&PostParams::default(), obj).await.expect("create");
    let status = json!({ "status": { "conditions": obj.conditions() } });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&status))
        .await
        .expect("patch status")
}

#[test_log::test(tokio::test)]
#[ignore]
async fn registration_timeout_against_cluster() {
    let client = Client::try_default().await.expect("kube client");
    let pools: Api<NodePool> = Api::all(client.clone());
    let claims: Api<NodeClaim> = Api::all(client.clone());

    let pool_name = uniq("oaas-it-pool");
    let claim_name = uniq("oaas-it-claim");
    create_with_status(&pools, &node_pool(&pool_name, Some(ConditionStatus::Unknown)))
        .await;
    let claim = create_with_status(
        &claims,
        &node_claim(
            &claim_name,
            Some(&pool_name),
            vec![
                cond(CONDITION_LAUNCHED, ConditionStatus::True, t0()),
                cond(CONDITION_REGISTERED, ConditionStatus::Unknown, t0()),
            ],
        ),
    )
    .await;

    let clock = FakeClock::new(t0());
    clock.step(Duration::from_secs(16 * 60));
    let liveness = Liveness::new(
        Arc::new(clock),
        Arc::new(KubeStore::new(client.clone())),
        Arc::new(RecordingSink::default()),
        Arc::new(TimeoutPolicies::default()),
    );

    let out = liveness.reconcile(&claim).await.expect("reconcile");
    assert_eq!(out, Outcome::Done);

    let pool = pools.get(&pool_name).await.expect("get pool");
    assert_eq!(
        pool.condition(CONDITION_NODE_REGISTRATION_HEALTHY)
            .map(|c| c.status),
        Some(ConditionStatus::False)
    );
    assert!(claims.get_opt(&claim_name).await.expect("get claim").is_none());

    let _ = pools.delete(&pool_name, &DeleteParams::default()).await;
}

#[test_log::test(tokio::test)]
#[ignore]
async fn stale_pool_version_conflicts_against_cluster() {
    use oprc_liveness::controller::store::ResourceStore;

    let client = Client::try_default().await.expect("kube client");
    let pools: Api<NodePool> = Api::all(client.clone());
    let pool_name = uniq("oaas-it-pool");
    let stale = create_with_status(&pools, &node_pool(&pool_name, None)).await;

    // Another writer bumps the resourceVersion.
    let bump = json!({ "metadata": { "labels": { "oaas.io/touched": "true" } } });
    pools
        .patch(&pool_name, &PatchParams::default(), &Patch::Merge(&bump))
        .await
        .expect("bump");

    let store = KubeStore::new(client.clone());
    let err = store
        .patch_node_pool_status(&stale, stale.metadata.resource_version.as_deref().expect("resourceVersion"))
        .await
        .expect_err("stale write must conflict");
    assert!(err.is_conflict());

    let _ = pools.delete(&pool_name, &DeleteParams::default()).await;
}
