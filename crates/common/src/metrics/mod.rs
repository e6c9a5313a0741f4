//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming: every metric carries the
//! `incentive_` prefix.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

use crate::records::RecordKind;

/// Metrics prefix for all incentive tracker metrics
pub const METRICS_PREFIX: &str = "incentive";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
];

/// Buckets for export rewrites, which grow with the table
pub const EXPORT_BUCKETS: &[f64] = &[
    0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Record metrics
    describe_counter!(
        format!("{}_records_total", METRICS_PREFIX),
        Unit::Count,
        "Record store operations by kind and operation"
    );

    // Export metrics
    describe_counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        Unit::Count,
        "Export writes by kind and outcome"
    );

    describe_histogram!(
        format!("{}_export_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Export rewrite latency in seconds"
    );

    describe_gauge!(
        format!("{}_export_rows", METRICS_PREFIX),
        Unit::Count,
        "Data rows in each kind's delimited export"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a store operation (create, update, delete)
pub fn record_record_op(kind: RecordKind, op: &'static str) {
    counter!(
        format!("{}_records_total", METRICS_PREFIX),
        "kind" => kind.slug(),
        "op" => op
    )
    .increment(1);
}

/// Record the outcome of one export write
pub fn record_export(kind: RecordKind, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        "kind" => kind.slug(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_export_duration_seconds", METRICS_PREFIX),
        "kind" => kind.slug()
    )
    .record(duration_secs);
}

pub fn set_export_rows(kind: RecordKind, rows: usize) {
    gauge!(
        format!("{}_export_rows", METRICS_PREFIX),
        "kind" => kind.slug()
    )
    .set(rows as f64);
}
