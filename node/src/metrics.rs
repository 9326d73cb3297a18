//! # Prometheus Metrics
//!
//! Exposes operational metrics for the node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Latency buckets for Groth16 operations, in seconds. Proving sits in the
/// tens of milliseconds, verification in single milliseconds.
const ZKP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Balances written through `/store/sum`.
    pub balances_stored_total: IntCounter,
    /// Distinct identities currently held in the balance store.
    pub stored_identities: IntGauge,
    /// Proofs returned to callers.
    pub proofs_issued_total: IntCounter,
    /// Proof requests refused because the balance was below the threshold.
    pub proofs_rejected_total: IntCounter,
    /// Verifications that returned `valid`.
    pub verifications_valid_total: IntCounter,
    /// Verifications that returned `invalid`.
    pub verifications_invalid_total: IntCounter,
    /// Proofs presented with a key id this node does not hold.
    pub key_mismatches_total: IntCounter,
    /// Wall-clock time of proof generation.
    pub prove_latency_seconds: Histogram,
    /// Wall-clock time of proof verification.
    pub verify_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> C {
    registry
        .register(Box::new(metric.clone()))
        .expect("metric registration");
    metric
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register(registry, IntCounter::new(name, help).expect("metric creation"))
}

fn latency(registry: &Registry, name: &str, help: &str) -> Histogram {
    let opts = HistogramOpts::new(name, help).buckets(ZKP_LATENCY_BUCKETS.to_vec());
    register(registry, Histogram::with_opts(opts).expect("metric creation"))
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("zkbalance".into()), None)
            .expect("failed to create prometheus registry");

        let stored_identities = register(
            &registry,
            IntGauge::new("stored_identities", "Identities currently holding a balance")
                .expect("metric creation"),
        );

        Self {
            balances_stored_total: counter(
                &registry,
                "balances_stored_total",
                "Total number of balances stored or overwritten",
            ),
            stored_identities,
            proofs_issued_total: counter(
                &registry,
                "proofs_issued_total",
                "Total number of threshold proofs issued",
            ),
            proofs_rejected_total: counter(
                &registry,
                "proofs_rejected_total",
                "Total number of proof requests with a balance below the threshold",
            ),
            verifications_valid_total: counter(
                &registry,
                "verifications_valid_total",
                "Total number of proofs verified as valid",
            ),
            verifications_invalid_total: counter(
                &registry,
                "verifications_invalid_total",
                "Total number of proofs verified as invalid",
            ),
            key_mismatches_total: counter(
                &registry,
                "key_mismatches_total",
                "Total number of proofs presented under an unknown key pair",
            ),
            prove_latency_seconds: latency(
                &registry,
                "prove_latency_seconds",
                "Groth16 proof generation latency in seconds",
            ),
            verify_latency_seconds: latency(
                &registry,
                "verify_latency_seconds",
                "Groth16 proof verification latency in seconds",
            ),
            registry,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
