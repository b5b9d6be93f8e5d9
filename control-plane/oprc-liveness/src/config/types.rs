use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct LivenessConfig {
    #[envconfig(from = "HTTP_PORT", default = "8089")]
    pub http_port: u16,

    /// Default tracing directive; RUST_LOG still applies on top.
    /// Env: OPRC_LIVENESS_LOG
    #[envconfig(from = "OPRC_LIVENESS_LOG", default = "info")]
    pub log: String,

    /// Window for a claim's Launched condition to go True.
    /// Env: OPRC_LIVENESS_LAUNCH_TIMEOUT_SECS
    #[envconfig(from = "OPRC_LIVENESS_LAUNCH_TIMEOUT_SECS", default = "300")]
    pub launch_timeout_secs: u64,

    /// Window for a claim's Registered condition to go True.
    /// Env: OPRC_LIVENESS_REGISTRATION_TIMEOUT_SECS
    #[envconfig(
        from = "OPRC_LIVENESS_REGISTRATION_TIMEOUT_SECS",
        default = "900"
    )]
    pub registration_timeout_secs: u64,

    /// Delay used when a pass asks to be retried right away.
    /// Env: OPRC_LIVENESS_REQUEUE_NOW_MS
    #[envconfig(from = "OPRC_LIVENESS_REQUEUE_NOW_MS", default = "1000")]
    pub requeue_now_ms: u64,

    /// Requeue delay after a failed pass.
    /// Env: OPRC_LIVENESS_ERROR_BACKOFF_SECS
    #[envconfig(from = "OPRC_LIVENESS_ERROR_BACKOFF_SECS", default = "5")]
    pub error_backoff_secs: u64,
}

impl LivenessConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }

    pub fn requeue_now_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_now_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}
