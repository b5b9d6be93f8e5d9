#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use kube::api::ObjectMeta;
use oprc_liveness::controller::{
    Liveness, clock::FakeClock, metrics::DisruptionSink, store::MemoryStore,
    timeout::TimeoutPolicies,
};
use oprc_liveness::crd::{
    conditions::{Condition, ConditionStatus},
    node_claim::{
        CAPACITY_TYPE_LABEL, NODE_POOL_LABEL, NodeClaim, NodeClaimSpec,
        NodeClaimStatus,
    },
    node_pool::{
        CONDITION_NODE_REGISTRATION_HEALTHY, NodePool, NodePoolSpec,
        NodePoolStatus,
    },
};

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disruption {
    pub reason: String,
    pub node_pool: String,
    pub capacity_type: String,
}

#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<Disruption>>);

impl RecordingSink {
    pub fn recorded(&self) -> Vec<Disruption> {
        self.0.lock().unwrap().clone()
    }
}

impl DisruptionSink for RecordingSink {
    fn record_disruption(&self, reason: &str, node_pool: &str, capacity_type: &str) {
        self.0.lock().unwrap().push(Disruption {
            reason: reason.into(),
            node_pool: node_pool.into(),
            capacity_type: capacity_type.into(),
        });
    }
}

pub struct Harness {
    pub liveness: Liveness,
    pub store: MemoryStore,
    pub clock: FakeClock,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let clock = FakeClock::new(t0());
        let sink = Arc::new(RecordingSink::default());
        let liveness = Liveness::new(
            Arc::new(clock.clone()),
            Arc::new(store.clone()),
            sink.clone(),
            Arc::new(TimeoutPolicies::default()),
        );
        Self {
            liveness,
            store,
            clock,
            sink,
        }
    }
}

pub fn cond(
    type_: &str,
    status: ConditionStatus,
    at: DateTime<Utc>,
) -> Condition {
    Condition {
        type_: type_.into(),
        status,
        reason: None,
        message: None,
        last_transition_time: Some(at.to_rfc3339()),
        observed_generation: None,
    }
}

pub fn cond_with_reason(
    type_: &str,
    status: ConditionStatus,
    at: DateTime<Utc>,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        reason: Some(reason.into()),
        message: Some(message.into()),
        ..cond(type_, status, at)
    }
}

pub fn node_claim(
    name: &str,
    pool: Option<&str>,
    conditions: Vec<Condition>,
) -> NodeClaim {
    let mut labels = std::collections::BTreeMap::new();
    if let Some(pool) = pool {
        labels.insert(NODE_POOL_LABEL.to_string(), pool.to_string());
    }
    labels.insert(CAPACITY_TYPE_LABEL.to_string(), "spot".to_string());
    NodeClaim {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: NodeClaimSpec::default(),
        status: Some(NodeClaimStatus {
            conditions,
            ..Default::default()
        }),
    }
}

pub fn node_pool(name: &str, health: Option<ConditionStatus>) -> NodePool {
    let mut pool = NodePool::new(name, NodePoolSpec::default());
    pool.status = Some(NodePoolStatus {
        conditions: health
            .map(|s| vec![cond(CONDITION_NODE_REGISTRATION_HEALTHY, s, t0())])
            .unwrap_or_default(),
        ..Default::default()
    });
    pool
}
