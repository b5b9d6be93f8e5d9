use envconfig::Envconfig;
use kube::Client;
use oprc_liveness::{
    config::LivenessConfig,
    controller::{SERVICE_NAME, metrics::init_otlp_metrics_if_configured},
    init_tracing, runtime,
};
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = LivenessConfig::init_from_env()?;
    init_tracing(&cfg.log);
    info!(?cfg, "Starting nodeclaim liveness");

    match init_otlp_metrics_if_configured(SERVICE_NAME) {
        Ok(installed) => info!(installed, "otlp metrics exporter"),
        Err(e) => warn!(error = %e, "failed to install otlp metrics exporter"),
    }

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
