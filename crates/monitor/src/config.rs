//! Monitor configuration

use std::time::Duration;

use anyhow::{Context, Result};
use monitor_lib::anomaly::MONITORED_STATUSES;
use monitor_lib::EngineConfig;
use serde::Deserialize;

/// Optional configuration file read from the working directory
const CONFIG_FILE: &str = "monitor";

/// Monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// CSV file with historical buckets (`status`, `count` columns)
    #[serde(default = "default_history_path")]
    pub history_path: String,

    /// Maximum alerts returned by `GET /alerts`
    #[serde(default = "default_alert_list_limit")]
    pub alert_list_limit: usize,

    /// Rolling window capacity
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Most recent events evaluated per submission
    #[serde(default = "default_evaluation_size")]
    pub evaluation_size: usize,

    /// Lookback for active critical alerts in minutes
    #[serde(default = "default_active_lookback_minutes")]
    pub active_lookback_minutes: i64,

    /// Monitored statuses, comma separated when set through the environment
    #[serde(default = "default_monitored_statuses")]
    pub monitored_statuses: String,

    /// Fallback warning level for statuses without history
    #[serde(default = "default_warning")]
    pub default_warning: f64,

    /// Fallback critical level for statuses without history
    #[serde(default = "default_critical")]
    pub default_critical: f64,

    /// Multiple of the historical mean that flags a single event
    #[serde(default = "default_point_mean_multiplier")]
    pub point_mean_multiplier: f64,

    /// Bound on waiting for the engine lock in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "txn-monitor".to_string())
}

fn default_api_port() -> u16 {
    5000
}

fn default_history_path() -> String {
    "data/transactions.csv".to_string()
}

fn default_alert_list_limit() -> usize {
    50
}

fn default_window_capacity() -> usize {
    EngineConfig::default().window_capacity
}

fn default_evaluation_size() -> usize {
    EngineConfig::default().evaluation_size
}

fn default_active_lookback_minutes() -> i64 {
    EngineConfig::default().active_lookback_minutes
}

fn default_monitored_statuses() -> String {
    MONITORED_STATUSES.join(",")
}

fn default_warning() -> f64 {
    EngineConfig::default().default_warning
}

fn default_critical() -> f64 {
    EngineConfig::default().default_critical
}

fn default_point_mean_multiplier() -> f64 {
    EngineConfig::default().point_mean_multiplier
}

fn default_lock_timeout_ms() -> u64 {
    EngineConfig::default().lock_timeout.as_millis() as u64
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            history_path: default_history_path(),
            alert_list_limit: default_alert_list_limit(),
            window_capacity: default_window_capacity(),
            evaluation_size: default_evaluation_size(),
            active_lookback_minutes: default_active_lookback_minutes(),
            monitored_statuses: default_monitored_statuses(),
            default_warning: default_warning(),
            default_critical: default_critical(),
            point_mean_multiplier: default_point_mean_multiplier(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `monitor.toml` (optional) and `MONITOR_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()
            .context("Failed to read monitor configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse monitor configuration")
    }

    /// Engine parameters derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            window_capacity: self.window_capacity,
            evaluation_size: self.evaluation_size,
            active_lookback_minutes: self.active_lookback_minutes,
            monitored_statuses: self
                .monitored_statuses
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            default_warning: self.default_warning,
            default_critical: self.default_critical,
            point_mean_multiplier: self.point_mean_multiplier,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = MonitorConfig::default();
        let engine = config.engine_config();

        assert_eq!(config.api_port, 5000);
        assert_eq!(config.alert_list_limit, 50);
        assert_eq!(engine.window_capacity, 100);
        assert_eq!(engine.evaluation_size, 60);
        assert_eq!(engine.active_lookback_minutes, 10);
        assert_eq!(
            engine.monitored_statuses,
            vec!["FAILED", "DENIED", "REVERSED", "REJECTED"]
        );
        assert_eq!(engine.lock_timeout, Duration::from_millis(250));
        assert!(engine.validate().is_ok());
    }

    #[test]
    fn test_monitored_statuses_parsing() {
        let config = MonitorConfig {
            monitored_statuses: " failed, ,denied ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.engine_config().monitored_statuses,
            vec!["failed", "denied"]
        );
    }

    #[test]
    fn test_deserialize_with_partial_fields() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"api_port": 8080, "evaluation_size": 30}"#).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.evaluation_size, 30);
        assert_eq!(config.window_capacity, 100);
    }
}
