pub mod clock;
pub mod evaluator;
pub mod liveness;
pub mod metrics;
pub mod store;
pub mod timeout;


use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kube::{
    Api, Client,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LivenessConfig;
use crate::crd::node_claim::NodeClaim;

pub use liveness::{Liveness, LivenessError, Outcome};

use self::clock::SystemClock;
use self::metrics::init_liveness_metrics;
use self::store::KubeStore;
use self::timeout::TimeoutPolicies;

pub const SERVICE_NAME: &str = "oprc-liveness";

#[derive(Clone)]
pub struct ControllerContext {
    pub liveness: Liveness,
    pub requeue_now: Duration,
    pub error_backoff: Duration,
    pub shutdown: CancellationToken,
}

impl ControllerContext {
    pub fn new(
        liveness: Liveness,
        cfg: &LivenessConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            liveness,
            requeue_now: cfg.requeue_now_delay(),
            error_backoff: cfg.error_backoff(),
            shutdown,
        }
    }

    /// "Requeue now" still waits `requeue_now` so a claim whose conditions
    /// have not been written yet does not spin the work queue.
    pub fn action_for(&self, outcome: Outcome) -> Action {
        match outcome {
            Outcome::Done => Action::await_change(),
            Outcome::RequeueNow => Action::requeue(self.requeue_now),
            Outcome::RequeueAfter(after) => Action::requeue(after),
        }
    }
}

pub async fn run_controller(
    client: Client,
    cfg: LivenessConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let api: Api<NodeClaim> = Api::all(client.clone());
    let policies = TimeoutPolicies::from_config(&cfg);
    info!(
        launch_timeout = ?policies.launch.duration,
        registration_timeout = ?policies.registration.duration,
        "starting nodeclaim liveness controller"
    );
    let liveness = Liveness::new(
        Arc::new(SystemClock),
        Arc::new(KubeStore::new(client)),
        Arc::new(init_liveness_metrics(SERVICE_NAME)),
        Arc::new(policies),
    );
    let ctx = Arc::new(ControllerContext::new(liveness, &cfg, shutdown.clone()));

    Controller::new(api, Config::default())
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(claim = %obj_ref.name, ?action, "reconciled")
                }
                Err(e) => warn!(error = %e, "reconcile error"),
            }
        })
        .await;

    info!("nodeclaim liveness controller stopped");
    Ok(())
}

async fn reconcile(
    claim: Arc<NodeClaim>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, LivenessError> {
    let outcome = ctx
        .liveness
        .reconcile_until_cancelled(&claim, &ctx.shutdown)
        .await?;
    Ok(ctx.action_for(outcome))
}

fn error_policy(
    _claim: Arc<NodeClaim>,
    _error: &LivenessError,
    ctx: Arc<ControllerContext>,
) -> Action {
    Action::requeue(ctx.error_backoff)
}
