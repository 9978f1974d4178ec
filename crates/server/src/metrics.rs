//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Prediction proxy requests
//! - Pipeline phase (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use vibe_core::{Phase, PipelineState};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vibe_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vibe_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vibe_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Prediction Proxy Metrics
// =============================================================================

/// Proxy requests by operation and outcome.
pub static PROXY_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vibe_proxy_requests_total",
            "Prediction proxy requests by operation and outcome",
        ),
        &["operation", "outcome"], // outcome: "ok", "invalid", "upstream_error"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics (collected dynamically)
// =============================================================================

/// Current pipeline phase (1 for the active phase, 0 otherwise).
pub static PIPELINE_PHASE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("vibe_pipeline_phase", "Current pipeline phase"),
        &["phase"],
    )
    .unwrap()
});

/// Whether the prediction service has a credential (1) or not (0).
pub static SERVICE_CONFIGURED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vibe_prediction_service_configured",
        "Whether the prediction service credential is configured",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Proxy
    registry
        .register(Box::new(PROXY_REQUESTS_TOTAL.clone()))
        .unwrap();

    // Pipeline
    registry
        .register(Box::new(PIPELINE_PHASE.clone()))
        .unwrap();
    registry
        .register(Box::new(SERVICE_CONFIGURED.clone()))
        .unwrap();

    // Core metrics (predictions, pipeline runs, external service)
    for metric in vibe_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Set the phase gauge from a published pipeline state.
pub fn observe_pipeline_state(state: &PipelineState) {
    for phase in Phase::ALL {
        let value = if phase == state.phase { 1 } else { 0 };
        PIPELINE_PHASE.with_label_values(&[phase.as_str()]).set(value);
    }
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the current values.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    observe_pipeline_state(&state.orchestrator().state());
    SERVICE_CONFIGURED.set(if state.service().is_configured() { 1 } else { 0 });
}

/// Normalize a path for metric labels (replace job ids with a placeholder).
pub fn normalize_path(path: &str) -> String {
    match path.strip_prefix("/api/predictions/") {
        Some(rest) if !rest.is_empty() => "/api/predictions/{id}".to_string(),
        _ => path.to_string(),
    }
}
