//! Per-event classification
//!
//! Flags a single event when its status belongs to the critical set or its
//! count exceeds a multiple of the historical mean. Independent of the
//! rolling window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::thresholds::MONITORED_STATUSES;
use super::Baseline;
use crate::models::{normalize_status, LiveEvent};

/// Default multiple of the historical mean above which a count is flagged
pub const DEFAULT_MEAN_MULTIPLIER: f64 = 2.0;

/// Verdict for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointResult {
    pub status: String,
    pub count: u64,
    pub alert: bool,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PointClassifier {
    critical_statuses: Vec<String>,
    mean_multiplier: f64,
}

impl PointClassifier {
    pub fn new<S: AsRef<str>>(critical_statuses: &[S], mean_multiplier: f64) -> Self {
        Self {
            critical_statuses: critical_statuses
                .iter()
                .map(|s| normalize_status(s.as_ref()))
                .collect(),
            mean_multiplier,
        }
    }

    pub fn evaluate(&self, event: &LiveEvent, baseline: &Baseline) -> PointResult {
        let status = normalize_status(&event.status);
        let mut reasons = Vec::new();

        if self.critical_statuses.contains(&status) {
            reasons.push(format!("critical status {}", status));
        }

        let mean_note = match baseline.mean(&status) {
            Some(mean) => {
                let limit = mean * self.mean_multiplier;
                if event.count as f64 > limit {
                    reasons.push(format!(
                        "count {} exceeds {:.1}x baseline mean {:.2}",
                        event.count, self.mean_multiplier, mean
                    ));
                    None
                } else {
                    Some(format!(
                        "count {} within {:.1}x baseline mean {:.2}",
                        event.count, self.mean_multiplier, mean
                    ))
                }
            }
            None => Some(format!("no baseline for {}", status)),
        };

        let alert = !reasons.is_empty();
        let reason = if alert {
            reasons.join("; ")
        } else {
            mean_note.unwrap_or_default()
        };

        PointResult {
            status,
            count: event.count,
            alert,
            reason,
            timestamp: event.timestamp,
        }
    }
}

impl Default for PointClassifier {
    fn default() -> Self {
        Self::new(&MONITORED_STATUSES, DEFAULT_MEAN_MULTIPLIER)
    }
}
