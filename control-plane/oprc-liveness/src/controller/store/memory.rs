use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tokio::sync::RwLock;

use super::{ResourceStore, StoreError, StoreResult};
use crate::crd::{
    conditions::StatusConditions,
    node_claim::NodeClaim,
    node_pool::{NodePool, NodePoolStatus},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetNodePool,
    DeleteNodeClaim,
    PatchNodePoolStatus,
}

/// Failure to return from the next call of a given operation.
#[derive(Clone, Debug)]
pub enum StoreFault {
    NotFound,
    Conflict,
    Backend(String),
}

impl StoreFault {
    fn into_error(self, what: &str) -> StoreError {
        match self {
            StoreFault::NotFound => StoreError::NotFound(what.to_string()),
            StoreFault::Conflict => StoreError::Conflict(what.to_string()),
            StoreFault::Backend(msg) => StoreError::Backend(msg),
        }
    }
}

#[derive(Default)]
struct State {
    claims: HashMap<String, NodeClaim>,
    pools: HashMap<String, NodePool>,
    next_version: u64,
    faults: HashMap<StoreOp, StoreFault>,
    calls: HashMap<StoreOp, usize>,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn record(&mut self, op: StoreOp, what: &str) -> StoreResult<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.faults.remove(&op) {
            Some(fault) => Err(fault.into_error(what)),
            None => Ok(()),
        }
    }
}

/// In-process `ResourceStore` that versions every write the way the API
/// server does, so optimistic-lock conflicts behave the same.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_node_claim(&self, mut claim: NodeClaim) -> NodeClaim {
        let mut state = self.state.write().await;
        claim.metadata.resource_version = Some(state.bump());
        state.claims.insert(claim.name_any(), claim.clone());
        claim
    }

    pub async fn insert_node_pool(&self, mut pool: NodePool) -> NodePool {
        let mut state = self.state.write().await;
        pool.metadata.resource_version = Some(state.bump());
        state.pools.insert(pool.name_any(), pool.clone());
        pool
    }

    pub async fn node_claim(&self, name: &str) -> Option<NodeClaim> {
        self.state.read().await.claims.get(name).cloned()
    }

    pub async fn node_pool(&self, name: &str) -> Option<NodePool> {
        self.state.read().await.pools.get(name).cloned()
    }

    /// Make the next call of `op` fail with `fault`.
    pub async fn fail_next(&self, op: StoreOp, fault: StoreFault) {
        self.state.write().await.faults.insert(op, fault);
    }

    /// Number of times `op` was attempted, including injected failures.
    pub async fn calls(&self, op: StoreOp) -> usize {
        self.state
            .read()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_node_pool(&self, name: &str) -> StoreResult<NodePool> {
        let mut state = self.state.write().await;
        state.record(StoreOp::GetNodePool, name)?;
        state
            .pools
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("nodepool {name}")))
    }

    async fn delete_node_claim(&self, claim: &NodeClaim) -> StoreResult<()> {
        let name = claim.name_any();
        let mut state = self.state.write().await;
        state.record(StoreOp::DeleteNodeClaim, &name)?;
        state
            .claims
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("nodeclaim {name}")))
    }

    async fn patch_node_pool_status(
        &self,
        pool: &NodePool,
        expected_version: &str,
    ) -> StoreResult<()> {
        let name = pool.name_any();
        let mut state = self.state.write().await;
        state.record(StoreOp::PatchNodePoolStatus, &name)?;
        let current_version = match state.pools.get(&name) {
            Some(stored) => stored.metadata.resource_version.clone(),
            None => {
                return Err(StoreError::NotFound(format!("nodepool {name}")));
            }
        };
        if current_version.as_deref() != Some(expected_version) {
            return Err(StoreError::Conflict(format!(
                "nodepool {name}: expected version {expected_version}, found {}",
                current_version.unwrap_or_default()
            )));
        }
        let version = state.bump();
        let conditions = pool.conditions().to_vec();
        if let Some(stored) = state.pools.get_mut(&name) {
            stored
                .status
                .get_or_insert_with(NodePoolStatus::default)
                .conditions = conditions;
            stored.metadata.resource_version = Some(version);
        }
        Ok(())
    }
}
