//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Prediction jobs (creation, status requests, Replicate calls)
//! - Pipeline runs (stage durations, outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Prediction Metrics
// =============================================================================

/// Prediction jobs created, by kind and result.
pub static JOBS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vibe_jobs_created_total", "Total prediction jobs submitted"),
        &["kind", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// Status requests issued while polling, by observed outcome.
pub static JOB_STATUS_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vibe_job_status_requests_total",
            "Total job status requests issued by the poller",
        ),
        &["outcome"], // "pending", "succeeded", "failed", "canceled", "error"
    )
    .unwrap()
});

/// Replicate API request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vibe_external_service_duration_seconds",
            "Duration of prediction service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// Replicate API requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vibe_external_service_requests_total",
            "Total prediction service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Duration of each pipeline stage from job creation to terminal state.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vibe_stage_duration_seconds",
            "Duration of a pipeline stage",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]),
        &["kind", "result"],
    )
    .unwrap()
});

/// Pipeline runs by how they ended.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vibe_pipeline_runs_total", "Total pipeline runs by outcome"),
        &["outcome"], // "completed", "completed_without_audio", "error", "started"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Predictions
        Box::new(JOBS_CREATED.clone()),
        Box::new(JOB_STATUS_REQUESTS.clone()),
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        // Pipeline
        Box::new(STAGE_DURATION.clone()),
        Box::new(PIPELINE_RUNS.clone()),
    ]
}

/// Record a prediction service call.
pub fn record_external_call(service: &str, operation: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "error" };
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, status])
        .inc();
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        JOBS_CREATED.with_label_values(&["image", "success"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"vibe_jobs_created_total".to_string()));
    }

    #[test]
    fn test_record_external_call() {
        let before = EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["test", "create", "error"])
            .get();
        record_external_call("test", "create", false, 0.2);
        assert_eq!(
            EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&["test", "create", "error"])
                .get(),
            before + 1
        );
    }
}
