//! Transaction Monitor - payment transaction anomaly detection service
//!
//! Loads the historical dataset, builds the detection engine and serves
//! the monitoring API until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use monitor_lib::{
    anomaly::ThresholdMethod,
    health::{components, HealthRegistry},
    observability::{MonitorMetrics, StructuredLogger},
    Engine,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use txn_monitor::{api, config::MonitorConfig, history};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting txn-monitor");

    let config = MonitorConfig::load()?;
    info!(
        instance = %config.instance_name,
        history_path = %config.history_path,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ENGINE).await;
    health_registry.register(components::BASELINE).await;

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let records = history::load_history(&config.history_path)?;
    info!(records = records.len(), "Historical dataset loaded");

    let engine = Engine::with_config(&records, config.engine_config())
        .context("Failed to initialize detection engine")?
        .with_logger(logger.clone());

    let defaulted: Vec<&str> = engine
        .thresholds()
        .iter()
        .filter(|(_, entry)| entry.method == ThresholdMethod::Default)
        .map(|(status, _)| status)
        .collect();
    if !defaulted.is_empty() {
        let message = format!("no history for {}; using default thresholds", defaulted.join(", "));
        warn!(statuses = ?defaulted, "Monitored statuses without history");
        health_registry
            .set_degraded(components::BASELINE, message)
            .await;
    }

    logger.log_startup(MONITOR_VERSION, &config.history_path);

    let app_state = Arc::new(api::AppState::new(
        Arc::new(engine),
        health_registry.clone(),
        metrics,
        &config,
    ));

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.api_port, app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
