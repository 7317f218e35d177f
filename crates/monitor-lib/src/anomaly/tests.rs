//! End-to-end tests for the detection pipeline
//!
//! history -> baseline -> thresholds -> rolling window -> classifiers -> alert log

use chrono::{Duration, TimeZone, Utc};

use super::*;
use crate::models::{HistoricalRecord, LiveEvent, Severity};

fn history() -> Vec<HistoricalRecord> {
    let mut records = Vec::new();
    for c in [100, 95, 105, 110, 90, 120, 80, 100] {
        records.push(HistoricalRecord::new("approved", c));
    }
    // Typical failure volume per bucket, occasionally higher
    for c in [2, 3, 1, 4, 2, 3, 5, 2, 8, 3] {
        records.push(HistoricalRecord::new("failed", c));
    }
    for c in [1, 2, 1, 3] {
        records.push(HistoricalRecord::new("denied", c));
    }
    records
}

fn pipeline() -> (Baseline, ThresholdPolicy, WindowClassifier, PointClassifier) {
    let baseline = Baseline::build(&history()).unwrap();
    let thresholds =
        ThresholdPolicy::configure(&baseline, &MONITORED_STATUSES, ThresholdDefaults::default())
            .unwrap();
    (
        baseline,
        thresholds,
        WindowClassifier::default(),
        PointClassifier::default(),
    )
}

#[test]
fn test_thresholds_follow_history() {
    let (baseline, thresholds, _, _) = pipeline();

    let failed = thresholds.get("FAILED").unwrap();
    assert_eq!(failed.method, ThresholdMethod::Percentile);
    assert_eq!(failed.warning, baseline.get("FAILED").unwrap().p95);
    assert_eq!(failed.critical, baseline.get("FAILED").unwrap().p99);

    // No REVERSED/REJECTED history
    assert_eq!(thresholds.get("REVERSED").unwrap().method, ThresholdMethod::Default);
    assert_eq!(thresholds.get("REJECTED").unwrap().critical, 20.0);
}

#[test]
fn test_escalation_as_failures_accumulate() {
    let (_, thresholds, classifier, _) = pipeline();
    let mut window = RollingWindow::new(DEFAULT_WINDOW_CAPACITY);
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    for i in 0..5 {
        window.push(LiveEvent::new("APPROVED", 110, base + Duration::minutes(i)));
    }
    let quiet = classifier.evaluate(
        &window.snapshot(DEFAULT_EVALUATION_SIZE),
        &thresholds,
        base,
    );
    assert_eq!(quiet.severity, Severity::Normal);

    // FAILED p95 ~6.65, p99 ~7.73 over the history above
    window.push(LiveEvent::new("FAILED", 7, base + Duration::minutes(6)));
    let warning = classifier.evaluate(
        &window.snapshot(DEFAULT_EVALUATION_SIZE),
        &thresholds,
        base,
    );
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.anomaly_score, 50);

    window.push(LiveEvent::new("FAILED", 5, base + Duration::minutes(7)));
    let critical = classifier.evaluate(
        &window.snapshot(DEFAULT_EVALUATION_SIZE),
        &thresholds,
        base,
    );
    assert_eq!(critical.severity, Severity::Critical);
    assert_eq!(critical.alerts[0].count, 12);
    assert_eq!(critical.status_counts.as_ref().unwrap()["APPROVED"], 550);
}

#[test]
fn test_classifiers_can_disagree() {
    let (baseline, thresholds, classifier, point) = pipeline();
    let at = Utc::now();

    // A single FAILED event is always flagged individually,
    // but one failure in a window stays under the volume thresholds.
    let event = LiveEvent::new("FAILED", 1, at);
    let individual = point.evaluate(&event, &baseline);
    let window = classifier.evaluate(&[event], &thresholds, at);
    assert!(individual.alert);
    assert!(!window.alert);

    // A large APPROVED bucket is flagged individually but never by the window.
    let event = LiveEvent::new("APPROVED", 500, at);
    assert!(point.evaluate(&event, &baseline).alert);
    assert!(!classifier.evaluate(&[event], &thresholds, at).alert);
}

#[test]
fn test_alert_log_records_only_alerting_windows() {
    let (_, thresholds, classifier, _) = pipeline();
    let mut store = AlertStore::new();
    let now = Utc::now();

    let normal = classifier.evaluate(&[LiveEvent::new("APPROVED", 100, now)], &thresholds, now);
    assert!(store.record(&normal).is_none());

    let burst = classifier.evaluate(
        &[
            LiveEvent::new("FAILED", 30, now),
            LiveEvent::new("DENIED", 30, now),
            LiveEvent::new("REJECTED", 25, now),
        ],
        &thresholds,
        now,
    );
    assert_eq!(burst.anomaly_score, MAX_ANOMALY_SCORE);

    let record = store.record(&burst).unwrap();
    assert_eq!(record.id, 1);
    assert_eq!(record.details.len(), 3);
    assert_eq!(record.status_counts["REJECTED"], 25);
    assert_eq!(
        store
            .active_at(now, Duration::minutes(DEFAULT_ACTIVE_LOOKBACK_MINUTES), Severity::Critical)
            .len(),
        1
    );
}
