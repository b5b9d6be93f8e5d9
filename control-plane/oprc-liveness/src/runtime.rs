use std::{future::Future, net::SocketAddr};

use kube::Client;
use tokio::{task::JoinHandle, try_join};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::LivenessConfig, controller::run_controller, web::run_http_server,
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &LivenessConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn `fut`, cancelling `shutdown` if it fails so sibling tasks stop too.
fn spawn_linked<F>(
    task: &'static str,
    shutdown: CancellationToken,
    fut: F,
) -> JoinHandle<anyhow::Result<()>>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let res = fut.await;
        if let Err(e) = &res {
            error!(task, error = %e, "task failed, shutting down");
            shutdown.cancel();
        }
        res
    })
}

/// Spawn the NodeClaim controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: LivenessConfig,
    shutdown: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    let fut = run_controller(client, cfg, shutdown.clone());
    spawn_linked("controller", shutdown, fut)
}

/// Spawn the health endpoint server.
pub fn spawn_http(
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    let fut = run_http_server(addr, shutdown.clone());
    spawn_linked("http", shutdown, fut)
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Start the controller and HTTP server. A shutdown signal, or either task
/// failing, stops both.
pub async fn run_all(client: Client, cfg: LivenessConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let http_addr = compute_http_addr(&cfg);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_token.cancel();
    });

    let controller = spawn_controller(client, cfg, shutdown.clone());
    let http = spawn_http(http_addr, shutdown);

    let (c_res, h_res) = try_join!(controller, http)?;
    c_res?;
    h_res?;
    Ok(())
}
