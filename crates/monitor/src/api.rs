//! HTTP API exposing the monitoring engine

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use monitor_lib::{
    anomaly::AlertRecord,
    health::{components, ComponentStatus, HealthRegistry, HealthResponse},
    observability::MonitorMetrics,
    Engine, EventSubmission, MonitorError, Statistics, SubmitOutcome,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::MonitorConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub alert_list_limit: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<Engine>,
        health_registry: HealthRegistry,
        metrics: MonitorMetrics,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
            alert_list_limit: config.alert_list_limit,
            started_at: Instant::now(),
        }
    }
}

/// Error returned by handlers, rendered as `{ "success": false, "error": ... }`
#[derive(Debug)]
pub enum ApiError {
    Engine(MonitorError),
    BadRequest(String),
    Internal(String),
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Engine(err) => {
                let status = match err {
                    MonitorError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
                    MonitorError::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    MonitorError::EmptyDataset
                    | MonitorError::InvariantViolation(_)
                    | MonitorError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct TransactionResponse {
    success: bool,
    #[serde(flatten)]
    outcome: SubmitOutcome,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveAlertsQuery {
    pub minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ActiveAlertsResponse {
    active_critical_alerts: usize,
    lookback_minutes: i64,
    alerts: Vec<AlertRecord>,
}

#[derive(Debug, Serialize)]
struct ApiStats {
    total_alerts_generated: usize,
    transactions_in_buffer: usize,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    detector_stats: Statistics,
    api_stats: ApiStats,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    #[serde(flatten)]
    health: HealthResponse,
    detector_initialized: bool,
    timestamp: String,
}

/// Service description
async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "Transaction Monitoring API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
        "endpoints": {
            "POST /transaction": "Submit an event and receive its analysis",
            "GET /alerts": "List recorded alerts",
            "GET /alerts/active": "List recent critical alerts",
            "GET /stats": "Detector and API statistics",
            "GET /dashboard": "Aggregated view of the rolling window",
            "POST /reset": "Clear the rolling window and alert log",
            "GET /health": "Health check",
            "GET /readyz": "Readiness check",
            "GET /metrics": "Prometheus metrics"
        }
    }))
}

/// Submit one event
async fn submit_transaction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EventSubmission>, JsonRejection>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let Json(submission) = payload.map_err(|rejection| {
        state.metrics.inc_events_rejected();
        ApiError::BadRequest(rejection.body_text())
    })?;

    match state.engine.submit(submission).await {
        Ok(outcome) => Ok(Json(TransactionResponse {
            success: true,
            outcome,
        })),
        Err(err @ MonitorError::Busy { .. }) => {
            state
                .health_registry
                .set_degraded(components::ENGINE, err.to_string())
                .await;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(state.alert_list_limit);
    let listing = state.engine.list_alerts(limit).await?;
    Ok(Json(listing))
}

async fn active_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveAlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let minutes = query
        .minutes
        .unwrap_or(state.engine.config().active_lookback_minutes);
    let alerts = state.engine.active_critical_alerts(minutes).await?;

    Ok(Json(ActiveAlertsResponse {
        active_critical_alerts: alerts.len(),
        lookback_minutes: minutes,
        alerts,
    }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let detector_stats = state.engine.statistics().await?;
    let api_stats = ApiStats {
        total_alerts_generated: detector_stats.total_alerts,
        transactions_in_buffer: detector_stats.events_in_window,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };

    Ok(Json(StatsResponse {
        detector_stats,
        api_stats,
    }))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.dashboard().await?))
}

async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.engine.reset().await?;
    state.health_registry.set_healthy(components::ENGINE).await;
    info!("Engine state reset via API");

    Ok(Json(json!({
        "message": "System reset",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(HealthBody {
            health,
            detector_initialized: true,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/transaction", post(submit_transaction))
        .route("/alerts", get(list_alerts))
        .route("/alerts/active", get(active_alerts))
        .route("/stats", get(stats))
        .route("/dashboard", get(dashboard))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}
