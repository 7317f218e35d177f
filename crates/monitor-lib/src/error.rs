//! Error taxonomy for the monitoring engine

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the monitoring engine
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No historical records were supplied at initialization
    #[error("historical dataset is empty; at least one record is required to build a baseline")]
    EmptyDataset,

    /// A submitted event was rejected at the ingress boundary
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Internal consistency failure, e.g. a warning threshold above its critical threshold
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Engine parameters are inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared state lock could not be acquired in time
    #[error("engine busy: state lock not acquired within {waited:?}")]
    Busy { waited: Duration },
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, MonitorError>;
