//! Transaction Monitor CLI
//!
//! A command-line tool for submitting events, inspecting alerts and
//! statistics, and exercising the transaction monitor with simulated traffic.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, system, transactions};

/// Transaction Monitor CLI
#[derive(Parser)]
#[command(name = "txmon")]
#[command(author, version, about = "CLI for the Transaction Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via TXMON_API_URL env var)
    #[arg(long, env = "TXMON_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health
    Health,

    /// Submit a transaction event
    Submit {
        /// Transaction status (e.g. APPROVED, FAILED)
        #[arg(long, short)]
        status: String,

        /// Number of transactions in the event (defaults to 1 on the server)
        #[arg(long, short, allow_negative_numbers = true)]
        count: Option<i64>,

        /// RFC 3339 event timestamp (defaults to now on the server)
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Inspect recorded alerts
    #[command(subcommand)]
    Alerts(AlertsCommands),

    /// Show baseline, thresholds and buffer statistics
    Stats,

    /// Show the rolling window summary
    Dashboard,

    /// Clear the rolling window and alert log
    Reset,

    /// Send randomized normal traffic followed by a failure burst
    Simulate {
        /// Number of APPROVED events to send
        #[arg(long, default_value_t = 10)]
        normal: usize,

        /// Number of FAILED events to send afterwards
        #[arg(long, default_value_t = 5)]
        failures: usize,
    },
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// List the most recent alerts
    List {
        /// Maximum number of alerts to show
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List critical alerts within a lookback window
    Active {
        /// Lookback in minutes
        #[arg(long, short)]
        minutes: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let format = config.format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&config.api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Health => {
            system::health(&client, format).await?;
        }
        Commands::Submit {
            status,
            count,
            timestamp,
        } => {
            transactions::submit(&client, status, count, timestamp, format).await?;
        }
        Commands::Alerts(alerts_cmd) => match alerts_cmd {
            AlertsCommands::List { limit } => {
                alerts::list_alerts(&client, limit, format).await?;
            }
            AlertsCommands::Active { minutes } => {
                alerts::active_alerts(&client, minutes, format).await?;
            }
        },
        Commands::Stats => {
            system::stats(&client, format).await?;
        }
        Commands::Dashboard => {
            system::dashboard(&client, format).await?;
        }
        Commands::Reset => {
            system::reset(&client, format).await?;
        }
        Commands::Simulate { normal, failures } => {
            transactions::simulate(&client, normal, failures, format).await?;
        }
    }

    Ok(())
}
