//! Event submission commands

use anyhow::Result;
use colored::Colorize;
use rand::Rng;
use tabled::Tabled;

use crate::client::{ApiClient, SubmitRequest, SubmitResponse};
use crate::output::{
    color_severity, print_heading, print_info, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Count range for simulated approved traffic
const NORMAL_COUNT_RANGE: std::ops::RangeInclusive<i64> = 100..=130;

/// Count range for simulated failure bursts
const FAILURE_COUNT_RANGE: std::ops::RangeInclusive<i64> = 20..=40;

/// Row for the window alert details table
#[derive(Tabled)]
struct AlertDetailRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
}

/// Row for the simulation report
#[derive(Tabled)]
struct SimulationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Window")]
    severity: String,
    #[tabled(rename = "Score")]
    score: u8,
    #[tabled(rename = "Alert ID")]
    alert_id: String,
}

/// Submit a single event
pub async fn submit(
    client: &ApiClient,
    status: String,
    count: Option<i64>,
    timestamp: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = SubmitRequest {
        status,
        count,
        timestamp,
    };
    let response = client.submit(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_outcome(&response),
    }

    Ok(())
}

fn print_outcome(response: &SubmitResponse) {
    print_heading("Submission");
    println!(
        "Event:                  {} x{}",
        response.event.status.cyan(),
        response.event.count
    );
    println!(
        "Individual check:       {} ({})",
        if response.individual.alert {
            "ALERT".red().bold().to_string()
        } else {
            "ok".green().to_string()
        },
        response.individual.reason
    );
    println!(
        "Window severity:        {} (score {})",
        color_severity(&response.window.severity),
        response.window.anomaly_score
    );
    if let Some(total) = response.window.total_transactions {
        println!("Window transactions:    {}", total);
    }
    println!();

    if !response.window.alerts.is_empty() {
        let rows: Vec<AlertDetailRow> = response
            .window
            .alerts
            .iter()
            .map(|d| AlertDetailRow {
                status: d.status.clone(),
                count: d.count,
                severity: color_severity(&d.severity),
                threshold: format!("{:.2}", d.threshold),
            })
            .collect();
        print_table(rows, "");
        println!();
    }

    let recommendation = &response.recommendation;
    if recommendation.alert {
        print_warning(&format!(
            "{}: {}",
            recommendation.action, recommendation.message
        ));
    } else {
        print_success(&format!(
            "{}: {}",
            recommendation.action, recommendation.message
        ));
    }
    if let Some(id) = response.alert_id {
        print_info(&format!("Recorded alert #{}", id));
    }
}

/// Send randomized normal traffic followed by a failure burst
pub async fn simulate(
    client: &ApiClient,
    normal: usize,
    failures: usize,
    format: OutputFormat,
) -> Result<()> {
    let requests = {
        let mut rng = rand::thread_rng();
        let mut requests = Vec::with_capacity(normal + failures);
        for _ in 0..normal {
            requests.push(SubmitRequest {
                status: "APPROVED".to_string(),
                count: Some(rng.gen_range(NORMAL_COUNT_RANGE)),
                timestamp: None,
            });
        }
        for _ in 0..failures {
            requests.push(SubmitRequest {
                status: "FAILED".to_string(),
                count: Some(rng.gen_range(FAILURE_COUNT_RANGE)),
                timestamp: None,
            });
        }
        requests
    };

    let mut responses = Vec::with_capacity(requests.len());
    for request in &requests {
        responses.push(client.submit(request).await?);
    }

    let alerts = responses.iter().filter(|r| r.alert_id.is_some()).count();

    match format {
        OutputFormat::Json => print_json(&responses)?,
        OutputFormat::Table => {
            print_heading("Simulation");
            let rows: Vec<SimulationRow> = responses
                .iter()
                .enumerate()
                .map(|(i, r)| SimulationRow {
                    index: i + 1,
                    status: r.event.status.clone(),
                    count: r.event.count,
                    severity: color_severity(&r.window.severity),
                    score: r.window.anomaly_score,
                    alert_id: r.alert_id.map(|id| id.to_string()).unwrap_or_default(),
                })
                .collect();
            print_table(rows, "No events sent");
            println!(
                "\nSent {} normal and {} failure events, {} window alerts recorded",
                normal, failures, alerts
            );
        }
    }

    Ok(())
}
