//! Prometheus metrics for observability.
//!
//! Besides the conversion metrics exported by `wavesmith_core`, the server
//! tracks:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Batch occupancy and engine state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use tracing::error;
use wavesmith_core::JobStatus;

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
            "wavesmith_http_request_duration_seconds",
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
        Opts::new("wavesmith_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavesmith_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavesmith_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavesmith_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by event type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavesmith_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavesmith_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics (collected dynamically)
// =============================================================================

/// Jobs in the batch by current status.
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("wavesmith_jobs_by_status", "Current job count by status"),
        &["status"],
    )
    .unwrap()
});

/// Engine load state (1 = loaded, 0 = not loaded).
pub static ENGINE_LOADED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavesmith_engine_loaded",
        "Whether the conversion engine is loaded (1) or not (0)",
    )
    .unwrap()
});

/// Converted outputs held in memory.
pub static OUTPUTS_LIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavesmith_outputs_live",
        "Number of converted outputs currently held in memory",
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

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Batch
    registry
        .register(Box::new(JOBS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(ENGINE_LOADED.clone())).unwrap();
    registry.register(Box::new(OUTPUTS_LIVE.clone())).unwrap();

    // Core metrics (submissions, conversions, engine loads)
    for metric in wavesmith_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the batch as it is now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.controller().status().await;

    ENGINE_LOADED.set(i64::from(status.engine_loaded));
    OUTPUTS_LIVE.set(status.live_outputs as i64);

    let counts = &status.counts;
    for (job_status, count) in [
        (JobStatus::Idle, counts.idle),
        (JobStatus::Uploading, counts.uploading),
        (JobStatus::Converting, counts.converting),
        (JobStatus::Completed, counts.completed),
        (JobStatus::Failed, counts.failed),
    ] {
        JOBS_BY_STATUS
            .with_label_values(&[job_status.as_str()])
            .set(count as i64);
    }
}

static JOB_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/jobs/[^/]+").unwrap());

/// Normalize a path for metric labels (replace job ids with placeholders).
///
/// Job ids embed the uploaded file name, so every segment after `/jobs/` is
/// collapsed whatever it contains.
pub fn normalize_path(path: &str) -> String {
    JOB_SEGMENT.replace_all(path, "/jobs/{id}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_job_id() {
        let path = "/api/v1/jobs/song.mp3-1700000000000-0";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_job_download() {
        let path = "/api/v1/jobs/my%20track.flac-1700000000000-3/download";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}/download");
    }

    #[test]
    fn test_normalize_path_collection_untouched() {
        assert_eq!(normalize_path("/api/v1/jobs"), "/api/v1/jobs");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("wavesmith_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs vectors that have at least one child
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        WS_CONNECTIONS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        JOBS_BY_STATUS.with_label_values(&["idle"]).set(0);
        ENGINE_LOADED.set(0);
        wavesmith_core::metrics::JOBS_SUBMITTED.inc();

        let output = encode_metrics();

        assert!(output.contains("wavesmith_http_request_duration_seconds"));
        assert!(output.contains("wavesmith_http_requests_in_flight"));
        assert!(output.contains("wavesmith_ws_connections_active"));
        assert!(output.contains("wavesmith_ws_connections_total"));
        assert!(output.contains("wavesmith_jobs_by_status"));
        assert!(output.contains("wavesmith_engine_loaded"));
        assert!(output.contains("wavesmith_jobs_submitted_total"));
    }
}
