//! Historical baseline statistics
//!
//! Groups historical buckets by status and computes order statistics over
//! their counts. Built once at startup and read-only afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::models::{normalize_status, HistoricalRecord};

/// Descriptive statistics for one status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub mean: f64,
    /// Sample standard deviation; `None` when fewer than two samples exist
    pub std: Option<f64>,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl BaselineStats {
    /// Compute statistics over a non-empty set of counts
    fn from_counts(counts: &[u64]) -> Option<Self> {
        if counts.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Some(Self {
            mean,
            std: sample_std(&sorted, mean),
            median: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
            min: sorted[0],
            max: sorted[n - 1],
            samples: n,
        })
    }

    /// Z-score of a value against this baseline, if the spread is defined and non-zero
    pub fn z_score(&self, value: f64) -> Option<f64> {
        self.std
            .filter(|s| *s > f64::EPSILON)
            .map(|s| (value - self.mean) / s)
    }
}

/// Per-status baseline built from the historical dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Baseline {
    stats: BTreeMap<String, BaselineStats>,
}

impl Baseline {
    /// Build the baseline from historical records
    ///
    /// Fails with [`MonitorError::EmptyDataset`] when no records are given.
    pub fn build(records: &[HistoricalRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(MonitorError::EmptyDataset);
        }

        let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for record in records {
            groups
                .entry(normalize_status(&record.status))
                .or_default()
                .push(record.count);
        }

        let stats = groups
            .into_iter()
            .filter_map(|(status, counts)| {
                BaselineStats::from_counts(&counts).map(|s| (status, s))
            })
            .collect();

        Ok(Self { stats })
    }

    pub fn get(&self, status: &str) -> Option<&BaselineStats> {
        self.stats.get(status)
    }

    /// Historical mean for a status, if it was ever observed
    pub fn mean(&self, status: &str) -> Option<f64> {
        self.stats.get(status).map(|s| s.mean)
    }

    pub fn contains(&self, status: &str) -> bool {
        self.stats.contains_key(status)
    }

    /// Observed statuses in sorted order
    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.stats.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BaselineStats)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// Sample standard deviation (Bessel's correction)
fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Linear-interpolated percentile over sorted data, `q` in `[0, 1]`
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let frac = rank - lower as f64;
                sorted[lower] + (sorted[upper] - sorted[lower]) * frac
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn records(status: &str, counts: &[u64]) -> Vec<HistoricalRecord> {
        counts
            .iter()
            .map(|&c| HistoricalRecord::new(status, c))
            .collect()
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let result = Baseline::build(&[]);
        assert!(matches!(result, Err(MonitorError::EmptyDataset)));
    }

    #[test]
    fn test_known_statistics() {
        let baseline = Baseline::build(&records("failed", &[1, 2, 3, 4, 5])).unwrap();
        let stats = baseline.get("FAILED").unwrap();

        assert_eq!(stats.samples, 5);
        assert!((stats.mean - 3.0).abs() < 1e-9);
        assert!((stats.median - 3.0).abs() < 1e-9);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        // Sample variance of 1..=5 is 2.5
        assert!((stats.std.unwrap() - 2.5_f64.sqrt()).abs() < 1e-9);
        // rank = 0.95 * 4 = 3.8 -> 4 + 0.8 * (5 - 4)
        assert!((stats.p95 - 4.8).abs() < 1e-9);
        assert!((stats.p99 - 4.96).abs() < 1e-9);
    }

    #[test]
    fn test_status_grouping_is_case_insensitive() {
        let mut input = records("approved", &[100, 110]);
        input.push(HistoricalRecord {
            status: "Approved".to_string(),
            count: 120,
        });
        input.extend(records("DENIED", &[4]));

        let baseline = Baseline::build(&input).unwrap();
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline.get("APPROVED").unwrap().samples, 3);
        assert!((baseline.mean("APPROVED").unwrap() - 110.0).abs() < 1e-9);
        assert_eq!(baseline.statuses().collect::<Vec<_>>(), vec!["APPROVED", "DENIED"]);
    }

    #[test]
    fn test_single_sample_has_no_std() {
        let baseline = Baseline::build(&records("REVERSED", &[7])).unwrap();
        let stats = baseline.get("REVERSED").unwrap();

        assert!(stats.std.is_none());
        assert_eq!(stats.p95, 7.0);
        assert_eq!(stats.p99, 7.0);
        assert!(stats.z_score(100.0).is_none());
    }

    #[test]
    fn test_std_serializes_as_null_when_undefined() {
        let baseline = Baseline::build(&records("REVERSED", &[7])).unwrap();
        let json = serde_json::to_value(&baseline).unwrap();
        assert!(json["REVERSED"]["std"].is_null());
        assert_eq!(json["REVERSED"]["mean"], 7.0);
    }

    #[test]
    fn test_z_score() {
        let baseline = Baseline::build(&records("FAILED", &[2, 4, 4, 4, 5, 5, 7, 9])).unwrap();
        let stats = baseline.get("FAILED").unwrap();
        let z = stats.z_score(stats.mean).unwrap();
        assert!(z.abs() < 1e-9);
        assert!(stats.z_score(20.0).unwrap() > 3.0);
    }

    #[test]
    fn test_constant_series_has_zero_spread() {
        let baseline = Baseline::build(&records("FAILED", &[5, 5, 5])).unwrap();
        let stats = baseline.get("FAILED").unwrap();
        assert_eq!(stats.std, Some(0.0));
        assert_eq!(stats.p95, stats.p99);
        assert!(stats.z_score(6.0).is_none());
    }

    proptest! {
        #[test]
        fn property_percentiles_are_ordered(counts in proptest::collection::vec(0u64..10_000, 2..200)) {
            let baseline = Baseline::build(&records("FAILED", &counts)).unwrap();
            let stats = baseline.get("FAILED").unwrap();

            prop_assert!(stats.p95 <= stats.p99);
            prop_assert!(stats.min <= stats.median);
            prop_assert!(stats.median <= stats.max);
            prop_assert!(stats.p99 <= stats.max);
            prop_assert!(stats.std.is_some());
        }
    }
}
