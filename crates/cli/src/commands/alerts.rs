//! Alert log commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{AlertRecord, ApiClient};
use crate::output::{color_severity, format_timestamp, print_json, print_table, OutputFormat};

/// Row for alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Details")]
    details: String,
}

fn alert_rows(alerts: &[AlertRecord]) -> Vec<AlertRow> {
    alerts
        .iter()
        .map(|a| AlertRow {
            id: a.id,
            timestamp: format_timestamp(&a.timestamp),
            severity: color_severity(&a.severity),
            details: a
                .details
                .iter()
                .map(|d| format!("{} {} (>= {:.2})", d.status, d.count, d.threshold))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

/// List recorded alerts
pub async fn list_alerts(client: &ApiClient, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let result = client.alerts(limit).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_table(alert_rows(&result.alerts), "No alerts recorded");
            println!(
                "\nShowing {} of {} alerts",
                result.alerts.len(),
                result.total_alerts
            );
        }
    }

    Ok(())
}

/// List recent critical alerts
pub async fn active_alerts(client: &ApiClient, minutes: Option<i64>, format: OutputFormat) -> Result<()> {
    let result = client.active_alerts(minutes).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let empty = format!(
                "No critical alerts in the last {} minutes",
                result.lookback_minutes
            );
            print_table(alert_rows(&result.alerts), &empty);
            println!(
                "\n{} active critical alerts (last {} minutes)",
                result.active_critical_alerts, result.lookback_minutes
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AlertDetail;

    #[test]
    fn test_alert_rows_join_details() {
        colored::control::set_override(false);
        let alerts = vec![AlertRecord {
            id: 7,
            timestamp: "2026-03-01T10:15:30Z".to_string(),
            severity: "CRITICAL".to_string(),
            details: vec![
                AlertDetail {
                    status: "FAILED".to_string(),
                    count: 30,
                    severity: "CRITICAL".to_string(),
                    threshold: 7.73,
                    message: String::new(),
                },
                AlertDetail {
                    status: "DENIED".to_string(),
                    count: 20,
                    severity: "CRITICAL".to_string(),
                    threshold: 2.96,
                    message: String::new(),
                },
            ],
            status_counts: Default::default(),
        }];

        let rows = alert_rows(&alerts);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 7);
        assert_eq!(rows[0].timestamp, "2026-03-01 10:15:30");
        assert_eq!(rows[0].details, "FAILED 30 (>= 7.73), DENIED 20 (>= 2.96)");
    }
}
