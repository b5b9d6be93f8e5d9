use async_trait::async_trait;
use kube::{
    Client, ResourceExt,
    api::{Api, DeleteParams, Patch, PatchParams},
};
use serde_json::json;
use tracing::trace;

use super::{ResourceStore, StoreError, StoreResult};
use crate::crd::{
    conditions::StatusConditions, node_claim::NodeClaim, node_pool::NodePool,
};

/// `ResourceStore` backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_node_pool(&self, name: &str) -> StoreResult<NodePool> {
        let api: Api<NodePool> = Api::all(self.client.clone());
        api.get(name).await.map_err(StoreError::from_kube)
    }

    async fn delete_node_claim(&self, claim: &NodeClaim) -> StoreResult<()> {
        let api: Api<NodeClaim> = Api::all(self.client.clone());
        api.delete(&claim.name_any(), &DeleteParams::default())
            .await
            .map_err(StoreError::from_kube)?;
        Ok(())
    }

    async fn patch_node_pool_status(
        &self,
        pool: &NodePool,
        expected_version: &str,
    ) -> StoreResult<()> {
        let api: Api<NodePool> = Api::all(self.client.clone());
        let name = pool.name_any();
        // A merge patch replaces the conditions list wholesale, so the
        // resourceVersion precondition is what keeps concurrent writers
        // from dropping each other's conditions.
        let patch = json!({
            "metadata": { "resourceVersion": expected_version },
            "status": { "conditions": pool.conditions() }
        });
        trace!(pool = %name, %expected_version, "patching nodepool status");
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(StoreError::from_kube)?;
        Ok(())
    }
}
