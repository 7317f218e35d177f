//! Monitoring engine
//!
//! Owns the immutable baseline/threshold snapshot and the mutable rolling
//! window + alert log. All mutable state sits behind a single lock so that
//! "push, classify, conditionally record" is one atomic step per submission.
//! Lock acquisition is bounded: callers that cannot get the lock within
//! `lock_timeout` are rejected with [`MonitorError::Busy`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::anomaly::{
    aggregate, AlertRecord, AlertStore, Baseline, PointClassifier, PointResult, RollingWindow,
    ThresholdDefaults, ThresholdPolicy, WindowClassifier, WindowResult,
    DEFAULT_ACTIVE_LOOKBACK_MINUTES, DEFAULT_CRITICAL_THRESHOLD, DEFAULT_EVALUATION_SIZE,
    DEFAULT_MEAN_MULTIPLIER, DEFAULT_WARNING_THRESHOLD, DEFAULT_WINDOW_CAPACITY,
    MONITORED_STATUSES,
};
use crate::error::{MonitorError, Result};
use crate::models::{EventSubmission, HistoricalRecord, LiveEvent, Severity};
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Default bound on waiting for the state lock
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Number of alerts shown on the dashboard
const DASHBOARD_RECENT_ALERTS: usize = 10;

/// Statuses counted as errors for the dashboard error rate
const ERROR_STATUSES: [&str; 3] = ["FAILED", "DENIED", "REJECTED"];

/// Engine parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of live events retained
    pub window_capacity: usize,
    /// Number of most recent events evaluated per submission
    pub evaluation_size: usize,
    /// Lookback for active critical alerts
    pub active_lookback_minutes: i64,
    /// Statuses graded by the window classifier and flagged by the point classifier
    pub monitored_statuses: Vec<String>,
    /// Fallback warning level for monitored statuses without history
    pub default_warning: f64,
    /// Fallback critical level for monitored statuses without history
    pub default_critical: f64,
    /// Multiple of the historical mean above which a single event is flagged
    pub point_mean_multiplier: f64,
    /// Bound on waiting for the shared state lock
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            evaluation_size: DEFAULT_EVALUATION_SIZE,
            active_lookback_minutes: DEFAULT_ACTIVE_LOOKBACK_MINUTES,
            monitored_statuses: MONITORED_STATUSES.iter().map(|s| s.to_string()).collect(),
            default_warning: DEFAULT_WARNING_THRESHOLD,
            default_critical: DEFAULT_CRITICAL_THRESHOLD,
            point_mean_multiplier: DEFAULT_MEAN_MULTIPLIER,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "window_capacity must be at least 1".to_string(),
            ));
        }
        if self.evaluation_size == 0 || self.evaluation_size > self.window_capacity {
            return Err(MonitorError::InvalidConfig(format!(
                "evaluation_size must be in 1..={}, got {}",
                self.window_capacity, self.evaluation_size
            )));
        }
        if self.active_lookback_minutes < 0 {
            return Err(MonitorError::InvalidConfig(
                "active_lookback_minutes must be non-negative".to_string(),
            ));
        }
        if self.monitored_statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(MonitorError::InvalidConfig(
                "at least one monitored status is required".to_string(),
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for status in &self.monitored_statuses {
            let normalized = status.trim().to_uppercase();
            if !normalized.is_empty() && !seen.insert(normalized.clone()) {
                return Err(MonitorError::InvalidConfig(format!(
                    "monitored status {} listed more than once",
                    normalized
                )));
            }
        }
        if !(self.default_warning <= self.default_critical) {
            return Err(MonitorError::InvalidConfig(format!(
                "default_warning {} exceeds default_critical {}",
                self.default_warning, self.default_critical
            )));
        }
        if !(self.point_mean_multiplier > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "point_mean_multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn threshold_defaults(&self) -> ThresholdDefaults {
        ThresholdDefaults {
            warning: self.default_warning,
            critical: self.default_critical,
        }
    }
}

/// Suggested operator action for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendedAction {
    Investigate,
    Monitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub alert: bool,
    pub severity: Severity,
    pub action: RecommendedAction,
    pub message: String,
}

impl Recommendation {
    fn from_window(window: &WindowResult) -> Self {
        Self {
            alert: window.alert,
            severity: window.severity,
            action: if window.alert {
                RecommendedAction::Investigate
            } else {
                RecommendedAction::Monitor
            },
            message: window.message.clone(),
        }
    }
}

/// Result of a single submission
///
/// The two classifier verdicts are independent and may disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub event: LiveEvent,
    pub individual: PointResult,
    pub window: WindowResult,
    pub recommendation: Recommendation,
    /// Id of the alert recorded by this submission, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertListing {
    pub total_alerts: usize,
    pub alerts: Vec<AlertRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub baseline: Baseline,
    pub thresholds: ThresholdPolicy,
    pub historical_records: usize,
    pub distinct_statuses: Vec<String>,
    pub events_in_window: usize,
    pub total_alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub total_transactions: u64,
    pub status_distribution: BTreeMap<String, u64>,
    pub error_rate_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
}

/// Summary of the whole rolling buffer and the alert log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub current_status: CurrentStatus,
    pub recent_alerts: Vec<AlertRecord>,
    pub alerts_count: AlertCounts,
    pub timestamp: DateTime<Utc>,
}

struct EngineState {
    window: RollingWindow,
    alerts: AlertStore,
}

/// The anomaly detection engine
pub struct Engine {
    config: EngineConfig,
    baseline: Baseline,
    thresholds: ThresholdPolicy,
    window_classifier: WindowClassifier,
    point_classifier: PointClassifier,
    historical_records: usize,
    state: Mutex<EngineState>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl Engine {
    /// Build an engine from historical records with default parameters
    pub fn initialize(history: &[HistoricalRecord]) -> Result<Self> {
        Self::with_config(history, EngineConfig::default())
    }

    /// Build an engine from historical records
    ///
    /// Fails with [`MonitorError::EmptyDataset`] for empty history and with
    /// [`MonitorError::InvariantViolation`] if thresholds come out inconsistent.
    pub fn with_config(history: &[HistoricalRecord], config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let baseline = Baseline::build(history)?;
        let thresholds = ThresholdPolicy::configure(
            &baseline,
            &config.monitored_statuses,
            config.threshold_defaults(),
        )?;

        let logger = StructuredLogger::new("txn-monitor");
        logger.log_baseline(history.len(), &baseline, &thresholds);

        let metrics = MonitorMetrics::new();
        metrics.set_window_events(0);

        info!(
            historical_records = history.len(),
            statuses = baseline.len(),
            window_capacity = config.window_capacity,
            evaluation_size = config.evaluation_size,
            "Engine initialized"
        );

        Ok(Self {
            window_classifier: WindowClassifier::new(&config.monitored_statuses),
            point_classifier: PointClassifier::new(
                &config.monitored_statuses,
                config.point_mean_multiplier,
            ),
            state: Mutex::new(EngineState {
                window: RollingWindow::new(config.window_capacity),
                alerts: AlertStore::new(),
            }),
            historical_records: history.len(),
            baseline,
            thresholds,
            config,
            metrics,
            logger,
        })
    }

    /// Use a named logger for structured engine events
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn thresholds(&self) -> &ThresholdPolicy {
        &self.thresholds
    }

    async fn lock_state(&self) -> Result<MutexGuard<'_, EngineState>> {
        tokio::time::timeout(self.config.lock_timeout, self.state.lock())
            .await
            .map_err(|_| MonitorError::Busy {
                waited: self.config.lock_timeout,
            })
    }

    /// Validate, buffer and classify one event
    ///
    /// Rejected submissions leave the engine state unchanged.
    pub async fn submit(&self, submission: EventSubmission) -> Result<SubmitOutcome> {
        let event = match LiveEvent::try_from(submission) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.inc_events_rejected();
                warn!(error = %e, "Rejected event submission");
                return Err(e);
            }
        };

        let individual = self.point_classifier.evaluate(&event, &self.baseline);

        let started = Instant::now();
        let (window, record, events_in_window) = {
            let mut state = match self.lock_state().await {
                Ok(state) => state,
                Err(e) => {
                    self.metrics.inc_events_rejected();
                    warn!(error = %e, status = %event.status, "Rejected event submission");
                    return Err(e);
                }
            };

            state.window.push(event.clone());
            let snapshot = state.window.snapshot(self.config.evaluation_size);
            let window =
                self.window_classifier
                    .evaluate(&snapshot, &self.thresholds, Utc::now());
            let record = state.alerts.record(&window);
            (window, record, state.window.len())
        };

        self.metrics
            .observe_evaluation_latency(started.elapsed().as_secs_f64());
        self.metrics.inc_events_submitted();
        self.metrics.set_window_events(events_in_window as i64);

        debug!(
            status = %event.status,
            count = event.count,
            severity = %window.severity,
            anomaly_score = window.anomaly_score,
            events_in_window = events_in_window,
            "Event evaluated"
        );

        if individual.alert {
            self.metrics.inc_point_alerts();
            self.logger.log_point_alert(&individual);
        }
        if let Some(ref record) = record {
            self.metrics.inc_window_alerts(record.severity);
            self.logger.log_window_alert(record, window.anomaly_score);
        }

        Ok(SubmitOutcome {
            recommendation: Recommendation::from_window(&window),
            alert_id: record.map(|r| r.id),
            event,
            individual,
            window,
        })
    }

    /// The most recent `limit` alerts (oldest first) and the total count
    pub async fn list_alerts(&self, limit: usize) -> Result<AlertListing> {
        let state = self.lock_state().await?;
        Ok(AlertListing {
            total_alerts: state.alerts.len(),
            alerts: state.alerts.list(Some(limit)),
        })
    }

    /// Critical alerts recorded within `within_minutes` of now
    pub async fn active_critical_alerts(&self, within_minutes: i64) -> Result<Vec<AlertRecord>> {
        // Lookbacks beyond the representable range mean "every alert"
        let within = chrono::Duration::try_minutes(within_minutes.max(0))
            .unwrap_or(chrono::Duration::MAX);
        let state = self.lock_state().await?;
        Ok(state.alerts.active(within, Severity::Critical))
    }

    /// Critical alerts within the configured lookback
    pub async fn active_critical_alerts_default(&self) -> Result<Vec<AlertRecord>> {
        self.active_critical_alerts(self.config.active_lookback_minutes)
            .await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        let state = self.lock_state().await?;
        Ok(Statistics {
            baseline: self.baseline.clone(),
            thresholds: self.thresholds.clone(),
            historical_records: self.historical_records,
            distinct_statuses: self.baseline.statuses().map(str::to_string).collect(),
            events_in_window: state.window.len(),
            total_alerts: state.alerts.len(),
        })
    }

    /// Aggregate view over the whole rolling buffer
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let state = self.lock_state().await?;

        let status_distribution = aggregate(state.window.iter());
        let total_transactions = status_distribution
            .values()
            .fold(0u64, |acc, c| acc.saturating_add(*c));
        let errors: u64 = ERROR_STATUSES
            .iter()
            .filter_map(|s| status_distribution.get(*s))
            .sum();

        Ok(Dashboard {
            current_status: CurrentStatus {
                total_transactions,
                error_rate_percent: error_rate_percent(errors, total_transactions),
                status_distribution,
            },
            recent_alerts: state.alerts.list(Some(DASHBOARD_RECENT_ALERTS)),
            alerts_count: AlertCounts {
                total: state.alerts.len(),
                critical: state.alerts.count_by_severity(Severity::Critical),
                warning: state.alerts.count_by_severity(Severity::Warning),
            },
            timestamp: Utc::now(),
        })
    }

    /// Wipe the rolling window and the alert log
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.lock_state().await?;
        let cleared_events = state.window.len();
        let cleared_alerts = state.alerts.len();
        state.window.clear();
        state.alerts.clear();
        drop(state);

        self.metrics.inc_resets();
        self.metrics.set_window_events(0);
        self.logger.log_reset(cleared_events, cleared_alerts);
        Ok(())
    }
}

/// Share of error events in percent, rounded to two decimals; 0 for an empty total
fn error_rate_percent(errors: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = errors as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
