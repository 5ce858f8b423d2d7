//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Batch intake (submissions, rejections, capacity drops)
//! - Conversions (results, durations)
//! - Engine (loads, released outputs)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Batch Intake Metrics
// =============================================================================

/// Jobs accepted into the batch.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavesmith_jobs_submitted_total",
        "Total jobs accepted into the batch",
    )
    .unwrap()
});

/// Files turned away at intake, by reason.
pub static FILES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "wavesmith_files_rejected_total",
            "Total files not admitted to the batch",
        ),
        &["reason"], // "extension", "capacity"
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions finished, by result and target format.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavesmith_conversions_total", "Total conversions finished"),
        &["result", "format"], // result: "success", "failed", "discarded"
    )
    .unwrap()
});

/// Time spent inside the engine per conversion.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "wavesmith_conversion_duration_seconds",
            "Duration of conversions holding the engine",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["format"],
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Engine load attempts by result.
pub static ENGINE_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavesmith_engine_loads_total", "Total engine load attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Output buffers released by removal or reset.
pub static OUTPUTS_RELEASED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavesmith_outputs_released_total",
        "Total converted outputs released",
    )
    .unwrap()
});

/// Returns all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(FILES_REJECTED.clone()),
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(ENGINE_LOADS.clone()),
        Box::new(OUTPUTS_RELEASED.clone()),
    ]
}
