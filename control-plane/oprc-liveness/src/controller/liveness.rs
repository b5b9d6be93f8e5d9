use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::clock::Clock;
use super::evaluator::{Decision, evaluate};
use super::metrics::DisruptionSink;
use super::store::{ResourceStore, StoreError, StoreResult};
use super::timeout::{TimeoutPolicies, TimeoutPolicy, TimeoutReason};
use crate::crd::{
    conditions::{ConditionStatus, ConditionValue, StatusConditions, set_condition},
    node_claim::{CONDITION_LAUNCHED, NodeClaim},
    node_pool::{CONDITION_NODE_REGISTRATION_HEALTHY, NodePoolStatus},
};

pub const REASON_REGISTRATION_FAILED: &str = "RegistrationFailed";
pub const MESSAGE_REGISTRATION_FAILED: &str = "Failed to register node";

/// Result of one liveness pass, handed back to whatever schedules passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    RequeueNow,
    RequeueAfter(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum LivenessError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("reconcile cancelled")]
    Cancelled,
}

/// Deletes claims that fail to launch or register in time and marks the
/// owning pool's registration health False.
#[derive(Clone)]
pub struct Liveness {
    clock: Arc<dyn Clock>,
    store: Arc<dyn ResourceStore>,
    metrics: Arc<dyn DisruptionSink>,
    policies: Arc<TimeoutPolicies>,
}

impl Liveness {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn ResourceStore>,
        metrics: Arc<dyn DisruptionSink>,
        policies: Arc<TimeoutPolicies>,
    ) -> Self {
        Self {
            clock,
            store,
            metrics,
            policies,
        }
    }

    pub fn policies(&self) -> &TimeoutPolicies {
        &self.policies
    }

    #[instrument(skip_all, fields(claim = %claim.name_any()))]
    pub async fn reconcile(
        &self,
        claim: &NodeClaim,
    ) -> Result<Outcome, LivenessError> {
        let policy = match evaluate(claim, self.clock.now(), &self.policies) {
            Decision::Done => return Ok(Outcome::Done),
            Decision::RequeueNow => return Ok(Outcome::RequeueNow),
            Decision::RequeueAfter(left) => {
                return Ok(Outcome::RequeueAfter(left));
            }
            Decision::Expired(policy) => *policy,
        };

        if policy.reason == TimeoutReason::Registration {
            match self.update_node_pool_registration_health(claim).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {}
                Err(StoreError::Conflict(msg)) => {
                    debug!(%msg, "nodepool changed since read; retrying");
                    return Ok(Outcome::RequeueNow);
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self.delete_for_timeout(&policy, claim).await {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(Outcome::Done),
            Err(e) => Err(e.into()),
        }
    }

    /// `reconcile`, abandoned with `LivenessError::Cancelled` as soon as
    /// `cancel` fires. Dropping the pass drops any in-flight store call.
    pub async fn reconcile_until_cancelled(
        &self,
        claim: &NodeClaim,
        cancel: &CancellationToken,
    ) -> Result<Outcome, LivenessError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LivenessError::Cancelled),
            res = self.reconcile(claim) => res,
        }
    }

    /// Set NodeRegistrationHealthy=False on the claim's pool if nobody has
    /// set it yet. Written with an optimistic lock on the version read here.
    async fn update_node_pool_registration_health(
        &self,
        claim: &NodeClaim,
    ) -> StoreResult<()> {
        let Some(pool_name) = claim.node_pool_name() else {
            return Ok(());
        };
        let mut pool = self.store.get_node_pool(pool_name).await?;
        match pool.condition_value(CONDITION_NODE_REGISTRATION_HEALTHY) {
            ConditionValue::Unknown | ConditionValue::Absent => {}
            ConditionValue::True | ConditionValue::False => return Ok(()),
        }

        let launched = claim.condition(CONDITION_LAUNCHED);
        let (reason, message) = match launched {
            Some(c) if c.is_true() => (
                REASON_REGISTRATION_FAILED.to_string(),
                MESSAGE_REGISTRATION_FAILED.to_string(),
            ),
            Some(c) => (
                c.reason.clone().unwrap_or_default(),
                c.message.clone().unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        // Without the version read here the write could not be conditional.
        let Some(expected_version) = pool.metadata.resource_version.clone()
        else {
            return Err(StoreError::Backend(format!(
                "nodepool {pool_name} has no resourceVersion"
            )));
        };
        set_condition(
            &mut pool
                .status
                .get_or_insert_with(NodePoolStatus::default)
                .conditions,
            CONDITION_NODE_REGISTRATION_HEALTHY,
            ConditionStatus::False,
            &reason,
            &message,
            self.clock.now(),
        );
        self.store
            .patch_node_pool_status(&pool, &expected_version)
            .await?;
        info!(pool = %pool_name, %reason, "marked nodepool registration unhealthy");
        Ok(())
    }

    async fn delete_for_timeout(
        &self,
        policy: &TimeoutPolicy,
        claim: &NodeClaim,
    ) -> StoreResult<()> {
        self.store.delete_node_claim(claim).await?;
        debug!(
            timeout = ?policy.duration,
            reason = %policy.reason,
            "terminating due to timeout"
        );
        self.metrics.record_disruption(
            policy.reason.as_str(),
            claim.node_pool_name().unwrap_or_default(),
            claim.capacity_type(),
        );
        Ok(())
    }
}
