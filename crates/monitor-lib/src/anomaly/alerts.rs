//! Append-only alert log
//!
//! Records every alerting window evaluation with a 1-based monotonically
//! increasing id. Records are never mutated or deduplicated; the log is
//! only emptied by an explicit reset.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::{AlertDetail, WindowResult};
use crate::models::Severity;

/// Default lookback for active alerts (10 minutes)
pub const DEFAULT_ACTIVE_LOOKBACK_MINUTES: i64 = 10;

/// A recorded alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub details: Vec<AlertDetail>,
    pub status_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    records: Vec<AlertRecord>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an alert for an alerting window result
    ///
    /// Returns `None` without touching the log when `result.alert` is false.
    pub fn record(&mut self, result: &WindowResult) -> Option<AlertRecord> {
        if !result.alert {
            return None;
        }

        let id = self.records.last().map(|r| r.id + 1).unwrap_or(1);
        let record = AlertRecord {
            id,
            timestamp: result.timestamp,
            severity: result.severity,
            details: result.alerts.clone(),
            status_counts: result.status_counts.clone().unwrap_or_default(),
        };

        self.records.push(record.clone());
        Some(record)
    }

    /// The most recent `limit` records, oldest first; all records when `limit` is `None`
    pub fn list(&self, limit: Option<usize>) -> Vec<AlertRecord> {
        let limit = limit.unwrap_or(self.records.len());
        let skip = self.records.len().saturating_sub(limit);
        self.records[skip..].to_vec()
    }

    /// Records of exactly `severity` recorded within `within` of now
    pub fn active(&self, within: Duration, severity: Severity) -> Vec<AlertRecord> {
        self.active_at(Utc::now(), within, severity)
    }

    /// Records of exactly `severity` recorded within `within` of `now`
    pub fn active_at(
        &self,
        now: DateTime<Utc>,
        within: Duration,
        severity: Severity,
    ) -> Vec<AlertRecord> {
        self.records
            .iter()
            .filter(|r| r.severity == severity && now.signed_duration_since(r.timestamp) <= within)
            .cloned()
            .collect()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.records.iter().filter(|r| r.severity == severity).count()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
