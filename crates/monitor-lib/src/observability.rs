//! Observability infrastructure for the transaction monitor
//!
//! Provides:
//! - Prometheus metrics (submissions, rejections, alerts, evaluation latency, window size)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::anomaly::{AlertRecord, Baseline, PointResult, ThresholdPolicy};
use crate::models::Severity;

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    evaluation_latency_seconds: Histogram,
    events_submitted: IntCounter,
    events_rejected: IntCounter,
    window_alerts: IntCounterVec,
    point_alerts: IntCounter,
    window_events: IntGauge,
    resets: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "txn_monitor_evaluation_latency_seconds",
                "Time spent pushing, classifying and recording one submission",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            events_submitted: register_int_counter!(
                "txn_monitor_events_submitted_total",
                "Total number of accepted event submissions"
            )
            .expect("Failed to register events_submitted"),

            events_rejected: register_int_counter!(
                "txn_monitor_events_rejected_total",
                "Total number of rejected event submissions (invalid or busy)"
            )
            .expect("Failed to register events_rejected"),

            window_alerts: register_int_counter_vec!(
                "txn_monitor_window_alerts_total",
                "Total number of recorded window alerts by severity",
                &["severity"]
            )
            .expect("Failed to register window_alerts"),

            point_alerts: register_int_counter!(
                "txn_monitor_point_alerts_total",
                "Total number of individual events flagged by the point classifier"
            )
            .expect("Failed to register point_alerts"),

            window_events: register_int_gauge!(
                "txn_monitor_window_events",
                "Number of live events currently held in the rolling window"
            )
            .expect("Failed to register window_events"),

            resets: register_int_counter!(
                "txn_monitor_resets_total",
                "Total number of engine state resets"
            )
            .expect("Failed to register resets"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_events_submitted(&self) {
        self.inner().events_submitted.inc();
    }

    pub fn inc_events_rejected(&self) {
        self.inner().events_rejected.inc();
    }

    pub fn inc_window_alerts(&self, severity: Severity) {
        self.inner()
            .window_alerts
            .with_label_values(&[&severity.to_string()])
            .inc();
    }

    pub fn inc_point_alerts(&self) {
        self.inner().point_alerts.inc();
    }

    pub fn set_window_events(&self, count: i64) {
        self.inner().window_events.set(count);
    }

    pub fn inc_resets(&self) {
        self.inner().resets.inc();
    }
}

/// Structured logger for monitor events
///
/// Provides consistent JSON-formatted logging for alerts, baseline
/// computation and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log the computed baseline and thresholds
    pub fn log_baseline(&self, records: usize, baseline: &Baseline, thresholds: &ThresholdPolicy) {
        info!(
            event = "baseline_computed",
            instance = %self.instance,
            historical_records = records,
            statuses = baseline.len(),
            "Baseline computed from history"
        );

        for (status, entry) in thresholds.iter() {
            info!(
                event = "threshold_configured",
                instance = %self.instance,
                status = %status,
                warning = entry.warning,
                critical = entry.critical,
                method = ?entry.method,
                "Threshold configured"
            );
        }
    }

    /// Log a recorded window alert
    pub fn log_window_alert(&self, record: &AlertRecord, anomaly_score: u8) {
        let statuses: Vec<&str> = record.details.iter().map(|d| d.status.as_str()).collect();
        let statuses = statuses.join(",");

        match record.severity {
            Severity::Critical => {
                warn!(
                    event = "window_alert",
                    instance = %self.instance,
                    alert_id = record.id,
                    severity = %record.severity,
                    anomaly_score = anomaly_score,
                    statuses = %statuses,
                    "Critical transaction anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "window_alert",
                    instance = %self.instance,
                    alert_id = record.id,
                    severity = %record.severity,
                    anomaly_score = anomaly_score,
                    statuses = %statuses,
                    "Transaction anomaly detected"
                );
            }
        }
    }

    /// Log an individual event flagged by the point classifier
    pub fn log_point_alert(&self, result: &PointResult) {
        info!(
            event = "point_alert",
            instance = %self.instance,
            status = %result.status,
            count = result.count,
            reason = %result.reason,
            "Event flagged"
        );
    }

    pub fn log_reset(&self, cleared_events: usize, cleared_alerts: usize) {
        warn!(
            event = "engine_reset",
            instance = %self.instance,
            cleared_events = cleared_events,
            cleared_alerts = cleared_alerts,
            "Engine state reset"
        );
    }

    pub fn log_startup(&self, version: &str, history_path: &str) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            history_path = %history_path,
            "Transaction monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Transaction monitor shutting down"
        );
    }
}
