//! Anomaly detection for payment transaction volumes
//!
//! This module provides:
//! - Historical baseline statistics per status
//! - Percentile-derived warning/critical thresholds
//! - A bounded rolling window of live events
//! - Window and per-event classifiers
//! - An append-only alert log

mod alerts;
mod baseline;
mod classifier;
mod point;
mod thresholds;
mod window;

#[cfg(test)]
mod tests;

pub use alerts::{AlertRecord, AlertStore, DEFAULT_ACTIVE_LOOKBACK_MINUTES};
pub use baseline::{Baseline, BaselineStats};
pub use classifier::{
    AlertDetail, WindowClassifier, WindowResult, EMPTY_WINDOW_MESSAGE, MAX_ANOMALY_SCORE,
    NORMAL_WINDOW_MESSAGE,
};
pub use point::{PointClassifier, PointResult, DEFAULT_MEAN_MULTIPLIER};
pub use thresholds::{
    ThresholdDefaults, ThresholdEntry, ThresholdMethod, ThresholdPolicy,
    DEFAULT_CRITICAL_THRESHOLD, DEFAULT_WARNING_THRESHOLD, MONITORED_STATUSES,
};
pub use window::{RollingWindow, DEFAULT_EVALUATION_SIZE, DEFAULT_WINDOW_CAPACITY};

pub(crate) use classifier::aggregate;
