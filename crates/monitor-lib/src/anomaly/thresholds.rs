//! Threshold policy derived from the historical baseline

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Baseline;
use crate::error::{MonitorError, Result};
use crate::models::normalize_status;

/// Statuses monitored for abnormal volume
pub const MONITORED_STATUSES: [&str; 4] = ["FAILED", "DENIED", "REVERSED", "REJECTED"];

/// Default warning threshold (events per bucket) for statuses without history
pub const DEFAULT_WARNING_THRESHOLD: f64 = 10.0;

/// Default critical threshold (events per bucket) for statuses without history
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 20.0;

/// How a threshold entry was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// p95 / p99 of the historical counts
    Percentile,
    /// Fixed fallback, no history for the status
    Default,
}

/// Warning and critical levels for one monitored status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub warning: f64,
    pub critical: f64,
    pub method: ThresholdMethod,
}

/// Fallback levels applied when a monitored status has no history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdDefaults {
    pub warning: f64,
    pub critical: f64,
}

impl Default for ThresholdDefaults {
    fn default() -> Self {
        Self {
            warning: DEFAULT_WARNING_THRESHOLD,
            critical: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

/// Thresholds per monitored status, immutable once configured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdPolicy {
    entries: BTreeMap<String, ThresholdEntry>,
}

impl ThresholdPolicy {
    /// Derive thresholds for each monitored status from the baseline
    pub fn configure<S: AsRef<str>>(
        baseline: &Baseline,
        monitored: &[S],
        defaults: ThresholdDefaults,
    ) -> Result<Self> {
        if !(defaults.warning <= defaults.critical) {
            return Err(MonitorError::InvariantViolation(format!(
                "default warning threshold {} exceeds critical threshold {}",
                defaults.warning, defaults.critical
            )));
        }

        let mut entries = BTreeMap::new();
        for status in monitored {
            let status = normalize_status(status.as_ref());
            let entry = match baseline.get(&status) {
                Some(stats) => ThresholdEntry {
                    warning: stats.p95,
                    critical: stats.p99,
                    method: ThresholdMethod::Percentile,
                },
                None => ThresholdEntry {
                    warning: defaults.warning,
                    critical: defaults.critical,
                    method: ThresholdMethod::Default,
                },
            };

            // Also catches NaN levels
            if !(entry.warning <= entry.critical) {
                return Err(MonitorError::InvariantViolation(format!(
                    "{} warning threshold {} exceeds critical threshold {}",
                    status, entry.warning, entry.critical
                )));
            }

            entries.insert(status, entry);
        }

        Ok(Self { entries })
    }

    /// Build a policy from explicit entries, checking `warning <= critical`
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ThresholdEntry)>,
    {
        let mut map = BTreeMap::new();
        for (status, entry) in entries {
            if !(entry.warning <= entry.critical) {
                return Err(MonitorError::InvariantViolation(format!(
                    "{} warning threshold {} exceeds critical threshold {}",
                    status, entry.warning, entry.critical
                )));
            }
            map.insert(normalize_status(&status), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, status: &str) -> Option<&ThresholdEntry> {
        self.entries.get(status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThresholdEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
