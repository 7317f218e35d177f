//! Health, statistics, dashboard and reset commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_severity, color_status, format_optional, format_timestamp, format_uptime,
    print_heading, print_json, print_success, print_table, OutputFormat,
};

/// Row for components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Row for the per-status baseline table
#[derive(Tabled)]
struct BaselineRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std")]
    std: String,
    #[tabled(rename = "P95")]
    p95: String,
    #[tabled(rename = "P99")]
    p99: String,
    #[tabled(rename = "Max")]
    max: String,
}

/// Row for thresholds table
#[derive(Tabled)]
struct ThresholdRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Warning")]
    warning: String,
    #[tabled(rename = "Critical")]
    critical: String,
    #[tabled(rename = "Method")]
    method: String,
}

/// Row for the status distribution table
#[derive(Tabled)]
struct DistributionRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: u64,
}

/// Show service health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_heading("Service Health");
            println!("Status:                 {}", color_status(&report.status));
            println!(
                "Detector initialized:   {}",
                if report.detector_initialized { "yes" } else { "no" }
            );
            println!(
                "Checked at:             {}",
                format_timestamp(&report.timestamp).dimmed()
            );
            println!();

            let rows: Vec<ComponentRow> = report
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(rows, "No components registered");
        }
    }

    Ok(())
}

/// Show baseline, thresholds and buffer statistics
pub async fn stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.stats().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            let detector = &report.detector_stats;
            print_heading("Detector Statistics");
            println!("Historical records:     {}", detector.historical_records);
            println!("Distinct statuses:      {}", detector.distinct_statuses.len());
            println!("Events in window:       {}", detector.events_in_window);
            println!("Alerts recorded:        {}", detector.total_alerts);
            println!(
                "Uptime:                 {}",
                format_uptime(report.api_stats.uptime_seconds)
            );
            println!();

            println!("{}", "Baseline".bold());
            let rows: Vec<BaselineRow> = detector
                .baseline
                .iter()
                .map(|(status, s)| BaselineRow {
                    status: status.clone(),
                    samples: s.samples,
                    mean: format!("{:.2}", s.mean),
                    std: format_optional(s.std),
                    p95: format!("{:.2}", s.p95),
                    p99: format!("{:.2}", s.p99),
                    max: format!("{:.0}", s.max),
                })
                .collect();
            print_table(rows, "No baseline");
            println!();

            println!("{}", "Thresholds".bold());
            let rows: Vec<ThresholdRow> = detector
                .thresholds
                .iter()
                .map(|(status, t)| ThresholdRow {
                    status: status.clone(),
                    warning: format!("{:.2}", t.warning),
                    critical: format!("{:.2}", t.critical),
                    method: t.method.clone(),
                })
                .collect();
            print_table(rows, "No thresholds configured");
        }
    }

    Ok(())
}

/// Show the rolling window summary
pub async fn dashboard(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let dashboard = client.dashboard().await?;

    match format {
        OutputFormat::Json => print_json(&dashboard)?,
        OutputFormat::Table => {
            let current = &dashboard.current_status;
            print_heading("Dashboard");
            println!("Transactions in window: {}", current.total_transactions);
            let rate = format!("{:.2}%", current.error_rate_percent);
            println!(
                "Error rate:             {}",
                if current.error_rate_percent > 0.0 {
                    rate.red().to_string()
                } else {
                    rate.green().to_string()
                }
            );
            println!(
                "Alerts:                 {} total, {} critical, {} warning",
                dashboard.alerts_count.total,
                dashboard.alerts_count.critical.to_string().red(),
                dashboard.alerts_count.warning.to_string().yellow()
            );
            println!();

            let rows: Vec<DistributionRow> = current
                .status_distribution
                .iter()
                .map(|(status, count)| DistributionRow {
                    status: status.clone(),
                    count: *count,
                })
                .collect();
            print_table(rows, "Window is empty");

            if let Some(latest) = dashboard.recent_alerts.last() {
                println!(
                    "\nLatest alert: #{} {} at {}",
                    latest.id,
                    color_severity(&latest.severity),
                    format_timestamp(&latest.timestamp)
                );
            }
        }
    }

    Ok(())
}

/// Clear the rolling window and alert log
pub async fn reset(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response = client.reset().await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!(
            "{} at {}",
            response.message,
            format_timestamp(&response.timestamp)
        )),
    }

    Ok(())
}
