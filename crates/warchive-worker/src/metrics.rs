//! Pipeline metrics.
//!
//! Counters by group outcome, photo failure marking, published videos, and
//! encode/run latency histograms.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use warchive_models::GroupReport;

use crate::error::{WorkerError, WorkerResult};

/// Metric name constants for consistency.
pub mod names {
    /// Finished groups by outcome.
    pub const GROUPS_TOTAL: &str = "warchive_groups_total";

    /// Photos flagged `is_failed` during retrieval.
    pub const PHOTOS_MARKED_FAILED_TOTAL: &str = "warchive_photos_marked_failed_total";

    /// Videos uploaded and recorded.
    pub const VIDEOS_PUBLISHED_TOTAL: &str = "warchive_videos_published_total";

    /// Encoder wall time in seconds.
    pub const ENCODE_DURATION_SECONDS: &str = "warchive_encode_duration_seconds";

    /// Run wall time in seconds.
    pub const RUN_DURATION_SECONDS: &str = "warchive_run_duration_seconds";
}

/// Record a finished group.
pub fn record_group(report: &GroupReport) {
    counter!(
        names::GROUPS_TOTAL,
        "outcome" => report.outcome.label()
    )
    .increment(1);

    if !report.photos_marked_failed.is_empty() {
        counter!(names::PHOTOS_MARKED_FAILED_TOTAL)
            .increment(report.photos_marked_failed.len() as u64);
    }

    if report.outcome.is_published() {
        counter!(names::VIDEOS_PUBLISHED_TOTAL).increment(1);
    }
}

pub fn record_encode_duration(seconds: f64) {
    histogram!(names::ENCODE_DURATION_SECONDS).record(seconds);
}

pub fn record_run_duration(seconds: f64) {
    histogram!(names::RUN_DURATION_SECONDS).record(seconds);
}

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}
