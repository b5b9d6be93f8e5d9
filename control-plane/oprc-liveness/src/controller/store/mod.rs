mod error;
mod k8s;
mod memory;

pub use error::{StoreError, StoreResult};
pub use k8s::KubeStore;
pub use memory::{MemoryStore, StoreFault, StoreOp};

use async_trait::async_trait;

use crate::crd::{node_claim::NodeClaim, node_pool::NodePool};

/// Access to the claim and pool resources the liveness check works against.
///
/// Deletes are idempotent at the store: a claim that is already gone reports
/// `StoreError::NotFound`. Pool status writes are conditional on the resource
/// version captured when the pool was read.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_node_pool(&self, name: &str) -> StoreResult<NodePool>;

    async fn delete_node_claim(&self, claim: &NodeClaim) -> StoreResult<()>;

    /// Replace the pool's status conditions, failing with
    /// `StoreError::Conflict` if the stored version is no longer
    /// `expected_version`. There is no unconditional variant.
    async fn patch_node_pool_status(
        &self,
        pool: &NodePool,
        expected_version: &str,
    ) -> StoreResult<()>;
}
