//! API client for communicating with the Transaction Monitor API

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the Transaction Monitor API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthReport> {
        self.get("health").await
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        self.post("transaction", request).await
    }

    pub async fn alerts(&self, limit: Option<usize>) -> Result<AlertList> {
        match limit {
            Some(limit) => self.get(&format!("alerts?limit={}", limit)).await,
            None => self.get("alerts").await,
        }
    }

    pub async fn active_alerts(&self, minutes: Option<i64>) -> Result<ActiveAlerts> {
        match minutes {
            Some(minutes) => self.get(&format!("alerts/active?minutes={}", minutes)).await,
            None => self.get("alerts/active").await,
        }
    }

    pub async fn stats(&self) -> Result<StatsReport> {
        self.get("stats").await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.get("dashboard").await
    }

    pub async fn reset(&self) -> Result<ResetResponse> {
        self.post("reset", &serde_json::json!({})).await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentReport>,
    #[serde(default)]
    pub detector_initialized: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub status: String,
    pub count: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualVerdict {
    pub alert: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDetail {
    pub status: String,
    pub count: u64,
    pub severity: String,
    pub threshold: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowVerdict {
    pub alert: bool,
    pub severity: String,
    pub anomaly_score: u8,
    #[serde(default)]
    pub alerts: Vec<AlertDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_transactions: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub alert: bool,
    pub severity: String,
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub event: Event,
    pub individual: IndividualVerdict,
    pub window: WindowVerdict,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: u64,
    pub timestamp: String,
    pub severity: String,
    #[serde(default)]
    pub details: Vec<AlertDetail>,
    #[serde(default)]
    pub status_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertList {
    pub total_alerts: usize,
    pub alerts: Vec<AlertRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAlerts {
    pub active_critical_alerts: usize,
    pub lookback_minutes: i64,
    pub alerts: Vec<AlertRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineStats {
    pub mean: f64,
    pub std: Option<f64>,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorStats {
    pub baseline: BTreeMap<String, BaselineStats>,
    pub thresholds: BTreeMap<String, Threshold>,
    pub historical_records: usize,
    pub distinct_statuses: Vec<String>,
    pub events_in_window: usize,
    pub total_alerts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStats {
    pub total_alerts_generated: usize,
    pub transactions_in_buffer: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub detector_stats: DetectorStats,
    pub api_stats: ApiStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub total_transactions: u64,
    pub status_distribution: BTreeMap<String, u64>,
    pub error_rate_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub current_status: CurrentStatus,
    pub recent_alerts: Vec<AlertRecord>,
    pub alerts_count: AlertCounts,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
