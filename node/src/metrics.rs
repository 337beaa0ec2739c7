//! # Prometheus Metrics
//!
//! Login-flow counters and verify latency, scraped at `/metrics` on the
//! dedicated metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `peerflash` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the server.
///
/// Clone-friendly (prometheus handles are `Arc` internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    /// Identities created through `/signup`.
    pub signups_total: IntCounter,
    /// Nonces handed out by `/login`.
    pub nonces_issued_total: IntCounter,
    /// Credentials that passed verification and received a session.
    pub verify_success_total: IntCounter,
    /// Failed verify attempts, labelled by `reason`.
    pub verify_failures_total: IntCounterVec,
    /// Requests turned away by the session gate.
    pub sessions_rejected_total: IntCounter,
    /// Time spent in `/verify`, successful or not.
    pub verify_latency_seconds: Histogram,
}

impl AuthMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("peerflash".into()), None)
            .expect("failed to create prometheus registry");

        let signups_total = IntCounter::new("signups_total", "Identities registered via signup")
            .expect("metric creation");
        registry
            .register(Box::new(signups_total.clone()))
            .expect("metric registration");

        let nonces_issued_total =
            IntCounter::new("nonces_issued_total", "Login nonces issued").expect("metric creation");
        registry
            .register(Box::new(nonces_issued_total.clone()))
            .expect("metric registration");

        let verify_success_total = IntCounter::new(
            "verify_success_total",
            "Credentials verified and exchanged for a session",
        )
        .expect("metric creation");
        registry
            .register(Box::new(verify_success_total.clone()))
            .expect("metric registration");

        let verify_failures_total = IntCounterVec::new(
            Opts::new("verify_failures_total", "Rejected verify attempts by reason"),
            &["reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(verify_failures_total.clone()))
            .expect("metric registration");

        let sessions_rejected_total = IntCounter::new(
            "sessions_rejected_total",
            "Requests to protected routes without a valid session",
        )
        .expect("metric creation");
        registry
            .register(Box::new(sessions_rejected_total.clone()))
            .expect("metric registration");

        let verify_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verify_latency_seconds",
                "Latency of the /verify handler in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(verify_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            signups_total,
            nonces_issued_total,
            verify_success_total,
            verify_failures_total,
            sessions_rejected_total,
            verify_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for AuthMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle stored in the app state.
pub type SharedMetrics = Arc<AuthMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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
