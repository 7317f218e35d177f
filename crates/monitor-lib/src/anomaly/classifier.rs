//! Window classification against the threshold policy
//!
//! Aggregates a window of events by status and grades each monitored status
//! against its warning/critical thresholds. Severity escalates monotonically
//! (`Normal < Warning < Critical`) and the anomaly score saturates at 100.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::thresholds::{ThresholdPolicy, MONITORED_STATUSES};
use crate::models::{normalize_status, LiveEvent, Severity};

/// Score contributed by a critical breach
const CRITICAL_BREACH_SCORE: u32 = 100;

/// Score contributed by a warning breach
const WARNING_BREACH_SCORE: u32 = 50;

/// Upper bound of the anomaly score
pub const MAX_ANOMALY_SCORE: u8 = 100;

pub const EMPTY_WINDOW_MESSAGE: &str = "no transactions to analyze";
pub const NORMAL_WINDOW_MESSAGE: &str = "All transactions within normal range";

/// One monitored status that breached a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetail {
    pub status: String,
    pub count: u64,
    pub severity: Severity,
    pub threshold: f64,
    pub message: String,
}

/// Outcome of evaluating one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub alert: bool,
    pub severity: Severity,
    pub anomaly_score: u8,
    /// Summed count per status; absent for an empty window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub alerts: Vec<AlertDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_transactions: Option<u64>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl WindowResult {
    fn empty(at: DateTime<Utc>) -> Self {
        Self {
            alert: false,
            severity: Severity::Normal,
            anomaly_score: 0,
            status_counts: None,
            alerts: Vec::new(),
            total_transactions: None,
            message: EMPTY_WINDOW_MESSAGE.to_string(),
            timestamp: at,
        }
    }
}

/// Grades windows of events for the monitored statuses
#[derive(Debug, Clone)]
pub struct WindowClassifier {
    monitored: Vec<String>,
}

impl WindowClassifier {
    /// Create a classifier for the given statuses; evaluation follows their order
    pub fn new<S: AsRef<str>>(monitored: &[S]) -> Self {
        Self {
            monitored: monitored
                .iter()
                .map(|s| normalize_status(s.as_ref()))
                .collect(),
        }
    }

    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    /// Evaluate a window against the thresholds
    ///
    /// Pure: the result depends only on the arguments. `at` is stamped on the
    /// result as the evaluation instant.
    pub fn evaluate(
        &self,
        window: &[LiveEvent],
        thresholds: &ThresholdPolicy,
        at: DateTime<Utc>,
    ) -> WindowResult {
        if window.is_empty() {
            return WindowResult::empty(at);
        }

        let status_counts = aggregate(window);

        let mut alerts = Vec::new();
        let mut severity = Severity::Normal;
        let mut score: u32 = 0;

        for status in &self.monitored {
            let Some(entry) = thresholds.get(status) else {
                continue;
            };
            let count = status_counts.get(status).copied().unwrap_or(0);
            let observed = count as f64;

            if observed >= entry.critical {
                alerts.push(AlertDetail {
                    status: status.clone(),
                    count,
                    severity: Severity::Critical,
                    threshold: entry.critical,
                    message: format!(
                        "{} critically high: {} (threshold: {:.0})",
                        status, count, entry.critical
                    ),
                });
                severity = severity.max(Severity::Critical);
                score += CRITICAL_BREACH_SCORE;
            } else if observed >= entry.warning {
                alerts.push(AlertDetail {
                    status: status.clone(),
                    count,
                    severity: Severity::Warning,
                    threshold: entry.warning,
                    message: format!(
                        "{} above normal: {} (threshold: {:.0})",
                        status, count, entry.warning
                    ),
                });
                severity = severity.max(Severity::Warning);
                score += WARNING_BREACH_SCORE;
            }
        }

        let anomaly_score = score.min(MAX_ANOMALY_SCORE as u32) as u8;
        let total_transactions = status_counts
            .values()
            .fold(0u64, |acc, c| acc.saturating_add(*c));

        let message = match alerts.len() {
            0 => NORMAL_WINDOW_MESSAGE.to_string(),
            1 => "1 anomaly detected".to_string(),
            n => format!("{} anomalies detected", n),
        };

        WindowResult {
            alert: !alerts.is_empty(),
            severity,
            anomaly_score,
            status_counts: Some(status_counts),
            alerts,
            total_transactions: Some(total_transactions),
            message,
            timestamp: at,
        }
    }
}

impl Default for WindowClassifier {
    fn default() -> Self {
        Self::new(&MONITORED_STATUSES)
    }
}

/// Sum counts per normalized status
pub(crate) fn aggregate<'a, I>(events: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a LiveEvent>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for event in events {
        let slot = counts.entry(normalize_status(&event.status)).or_insert(0);
        *slot = slot.saturating_add(event.count);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::thresholds::{ThresholdEntry, ThresholdMethod};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn ev(status: &str, count: u64) -> LiveEvent {
        LiveEvent::new(status, count, at())
    }

    fn entry(warning: f64, critical: f64) -> ThresholdEntry {
        ThresholdEntry {
            warning,
            critical,
            method: ThresholdMethod::Percentile,
        }
    }

    fn policy() -> ThresholdPolicy {
        ThresholdPolicy::from_entries([
            ("FAILED".to_string(), entry(10.0, 25.0)),
            ("DENIED".to_string(), entry(8.0, 18.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_window() {
        let result = WindowClassifier::default().evaluate(&[], &policy(), at());

        assert!(!result.alert);
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.anomaly_score, 0);
        assert_eq!(result.message, EMPTY_WINDOW_MESSAGE);
        assert!(result.status_counts.is_none());
        assert!(result.total_transactions.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("status_counts").is_none());
        assert!(json.get("total_transactions").is_none());
    }

    #[test]
    fn test_two_critical_breaches_clamp_score() {
        let window = vec![ev("FAILED", 30), ev("DENIED", 20), ev("APPROVED", 50)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());

        assert!(result.alert);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.anomaly_score, 100);
        assert_eq!(result.alerts.len(), 2);
        assert_eq!(result.alerts[0].status, "FAILED");
        assert_eq!(result.alerts[0].severity, Severity::Critical);
        assert_eq!(result.alerts[0].threshold, 25.0);
        assert_eq!(result.alerts[1].status, "DENIED");
        assert_eq!(result.alerts[1].severity, Severity::Critical);
        assert_eq!(result.total_transactions, Some(100));
        assert_eq!(result.message, "2 anomalies detected");
    }

    #[test]
    fn test_warning_breach() {
        let window = vec![ev("failed", 6), ev("FAILED", 6)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());

        assert!(result.alert);
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.anomaly_score, 50);
        assert_eq!(result.alerts[0].count, 12);
        assert_eq!(result.alerts[0].threshold, 10.0);
        assert_eq!(result.alerts[0].message, "FAILED above normal: 12 (threshold: 10)");
        assert_eq!(result.message, "1 anomaly detected");
    }

    #[test]
    fn test_critical_not_downgraded_by_later_warning() {
        // FAILED critical first, DENIED warning afterwards
        let window = vec![ev("FAILED", 40), ev("DENIED", 9)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());

        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.anomaly_score, 100);
        assert_eq!(result.alerts[1].severity, Severity::Warning);
    }

    #[test]
    fn test_two_warnings_reach_full_score() {
        let window = vec![ev("FAILED", 11), ev("DENIED", 9)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());

        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.anomaly_score, 100);
    }

    #[test]
    fn test_unmonitored_status_never_alerts() {
        let window = vec![ev("APPROVED", 1_000_000), ev("PROCESSING", 500)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());

        assert!(!result.alert);
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.message, NORMAL_WINDOW_MESSAGE);
        assert_eq!(result.status_counts.unwrap()["APPROVED"], 1_000_000);
    }

    #[test]
    fn test_missing_threshold_entry_is_skipped() {
        // REVERSED is monitored but has no entry in this policy
        let window = vec![ev("REVERSED", 1_000)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());
        assert!(!result.alert);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let window = vec![ev("FAILED", 25)];
        let result = WindowClassifier::default().evaluate(&window, &policy(), at());
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let classifier = WindowClassifier::default();
        let window = vec![ev("FAILED", 12), ev("DENIED", 30), ev("APPROVED", 3)];
        let thresholds = policy();

        let first = classifier.evaluate(&window, &thresholds, at());
        let second = classifier.evaluate(&window, &thresholds, at());
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_monitored_order_drives_alert_order() {
        let classifier = WindowClassifier::new(&["denied", "failed"]);
        let window = vec![ev("FAILED", 30), ev("DENIED", 20)];
        let result = classifier.evaluate(&window, &policy(), at());

        assert_eq!(result.alerts[0].status, "DENIED");
        assert_eq!(result.alerts[1].status, "FAILED");
    }
}
