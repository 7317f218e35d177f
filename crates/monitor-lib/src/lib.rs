//! Transaction monitoring library
//!
//! This crate provides the core functionality for:
//! - Baseline statistics over historical transaction buckets
//! - Threshold-based window classification with graded alerts
//! - Per-event classification against the baseline
//! - An append-only alert log behind a single engine lock
//! - Health checks and observability

pub mod anomaly;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;

pub use engine::{
    AlertCounts, AlertListing, CurrentStatus, Dashboard, Engine, EngineConfig, Recommendation,
    RecommendedAction, Statistics, SubmitOutcome,
};
pub use error::{MonitorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
