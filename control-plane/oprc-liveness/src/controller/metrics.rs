use std::sync::OnceLock;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};

pub const REASON_LABEL: &str = "reason";
pub const NODE_POOL_LABEL: &str = "nodepool";
pub const CAPACITY_TYPE_LABEL: &str = "capacity_type";

/// Receives one event per claim deleted for a timeout. Implementations must
/// not fail the caller; the deletion already happened.
pub trait DisruptionSink: Send + Sync {
    fn record_disruption(&self, reason: &str, node_pool: &str, capacity_type: &str);
}

#[derive(Clone)]
pub struct LivenessMetrics {
    pub nodeclaims_disrupted_total: Counter<u64>,
}

static LIVENESS_METRICS: OnceLock<LivenessMetrics> = OnceLock::new();

/// Initialize (or fetch existing) liveness metrics from the global meter.
/// Safe to call multiple times; the first call wins.
pub fn init_liveness_metrics(service_name: &'static str) -> LivenessMetrics {
    LIVENESS_METRICS
        .get_or_init(|| {
            let meter: Meter = opentelemetry::global::meter(service_name);
            let nodeclaims_disrupted_total = meter
                .u64_counter("karpenter.nodeclaims.disrupted.total")
                .with_description(
                    "Number of nodeclaims deleted because they did not launch or register in time",
                )
                .build();
            LivenessMetrics {
                nodeclaims_disrupted_total,
            }
        })
        .clone()
}

impl DisruptionSink for LivenessMetrics {
    #[inline]
    fn record_disruption(&self, reason: &str, node_pool: &str, capacity_type: &str) {
        self.nodeclaims_disrupted_total.add(
            1,
            &[
                KeyValue::new(REASON_LABEL, reason.to_string()),
                KeyValue::new(NODE_POOL_LABEL, node_pool.to_string()),
                KeyValue::new(CAPACITY_TYPE_LABEL, capacity_type.to_string()),
            ],
        );
    }
}

/// Pick the metrics endpoint, preferring the metrics-specific one. Blank
/// values count as unset.
fn otlp_endpoint_from(
    metrics: Option<String>,
    general: Option<String>,
) -> Option<String> {
    metrics
        .into_iter()
        .chain(general)
        .find(|v| !v.trim().is_empty())
}

/// Install an OTLP (gRPC) metrics exporter when an endpoint is configured.
/// Returns Ok(true) if installed, Ok(false) if skipped.
/// Env vars:
///  - OTEL_EXPORTER_OTLP_METRICS_ENDPOINT or OTEL_EXPORTER_OTLP_ENDPOINT
///  - OTEL_SERVICE_NAME (optional override)
pub fn init_otlp_metrics_if_configured(
    default_service: &str,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let Some(endpoint) = otlp_endpoint_from(
        std::env::var("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT").ok(),
        std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
    ) else {
        return Ok(false);
    };
    let service_name = std::env::var("OTEL_SERVICE_NAME")
        .unwrap_or_else(|_| default_service.to_string());

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(30))
        .build();
    let provider = SdkMeterProvider::builder()
        .with_resource(Resource::builder().with_service_name(service_name).build())
        .with_reader(reader)
        .build();
    opentelemetry::global::set_meter_provider(provider);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_idempotent() {
        let m1 = init_liveness_metrics("oprc-liveness-test");
        let m2 = init_liveness_metrics("oprc-liveness-test");
        // No exporter is installed; success is recording without panicking.
        m1.record_disruption("launch_timeout", "default", "spot");
        m2.record_disruption("registration_timeout", "", "");
    }

    #[test]
    fn otlp_endpoint_unset_or_blank_skips_exporter() {
        assert_eq!(otlp_endpoint_from(None, None), None);
        assert_eq!(otlp_endpoint_from(Some(String::new()), Some("  ".into())), None);
    }

    #[test]
    fn otlp_metrics_endpoint_wins_over_general() {
        let metrics = Some("http://metrics:4317".to_string());
        let general = Some("http://collector:4317".to_string());
        assert_eq!(
            otlp_endpoint_from(metrics, general.clone()).as_deref(),
            Some("http://metrics:4317")
        );
        assert_eq!(
            otlp_endpoint_from(Some(" ".into()), general).as_deref(),
            Some("http://collector:4317")
        );
    }
}
