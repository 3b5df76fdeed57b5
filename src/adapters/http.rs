//! HTTP API
//!
//! - `POST /send-sms`：單筆發送（同步或 `async: true`）
//! - `POST /send-bulk-sms`：批次發送
//! - `GET /sms-status/{id}`：查詢非同步工作
//! - `GET /health`、`GET /stats`：監控

use crate::core::dispatch::DispatchEngine;
use crate::core::pool::PoolOccupancy;
use crate::core::resolver::{resolve_recipients, resolve_single};
use crate::domain::model::{Recipient, SendOutcome};
use crate::utils::error::{DispatchError, ErrorCategory};
use crate::utils::monitor::{ProcessMonitor, ProcessStats};
use crate::utils::validation::require_field;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: DispatchEngine,
    pub default_batch_workers: usize,
    pub monitor: Arc<ProcessMonitor>,
}

impl AppState {
    pub fn new(engine: DispatchEngine, default_batch_workers: usize) -> Self {
        Self {
            engine,
            default_batch_workers,
            monitor: Arc::new(ProcessMonitor::default()),
        }
    }

    pub fn with_monitor(mut self, monitor: ProcessMonitor) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    pub to: Option<String>,
    pub message: Option<String>,
    #[serde(default, rename = "async")]
    pub is_async: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkSmsRequest {
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    pub message: Option<String>,
    pub max_workers: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AsyncAcceptedResponse {
    pub job_id: String,
    /// 與 job_id 相同，舊版客戶端讀取這個欄位
    pub sms_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub pool: PoolOccupancy,
    pub tracked_jobs: usize,
    pub uptime_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessStats>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_sent: u64,
    pub total_errors: u64,
    pub total_requests: u64,
    pub total_duration: f64,
    pub average_duration: f64,
    pub success_rate: f64,
    pub avg_sms_per_minute: f64,
    pub active_workers: usize,
    pub pool: PoolOccupancy,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: f64,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.user_friendly_message() })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for DispatchError {
    fn from(rejection: JsonRejection) -> Self {
        DispatchError::validation(rejection.body_text())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/send-sms", post(send_sms))
        .route("/send-bulk-sms", post(send_bulk_sms))
        .route("/sms-status/{id}", get(sms_status))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn send_sms(
    State(state): State<AppState>,
    payload: Result<Json<SendSmsRequest>, JsonRejection>,
) -> Result<Response, DispatchError> {
    let Json(req) = payload?;
    let to = require_field("to", &req.to)?;
    let message = require_field("message", &req.message)?;

    if req.is_async {
        let job_id = state.engine.send_one_async(to, message)?;
        return Ok((
            StatusCode::ACCEPTED,
            Json(AsyncAcceptedResponse {
                sms_id: job_id.clone(),
                job_id,
                status: "queued".to_string(),
            }),
        )
            .into_response());
    }

    let job = resolve_single(to, message)?;
    let outcome = state
        .engine
        .send_one(&job.destination, &job.message, state.engine.send_timeout())
        .await;

    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: SendOutcome) -> Response {
    let status = if outcome.is_sent() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(outcome)).into_response()
}

async fn send_bulk_sms(
    State(state): State<AppState>,
    payload: Result<Json<BulkSmsRequest>, JsonRejection>,
) -> Result<Response, DispatchError> {
    let Json(req) = payload?;
    // 驗證失敗時整批拒絕，不會送出任何一則
    let jobs = resolve_recipients(&req.recipients, req.message.as_deref())?;
    let max_workers = req.max_workers.unwrap_or(state.default_batch_workers);

    let result = state.engine.send_batch(jobs, max_workers).await;
    Ok((StatusCode::OK, Json(result)).into_response())
}

async fn sms_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, DispatchError> {
    let record = state.engine.job_status(&id)?;
    let status = if record.state.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(record)).into_response())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.engine;
    let status = if engine.pool().is_closed() {
        "shutting_down"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        pool: engine.pool().occupancy(),
        tracked_jobs: engine.registry().len(),
        uptime_seconds: engine.stats().uptime_seconds(),
        process: state.monitor.snapshot(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.engine.stats();

    Json(StatsResponse {
        total_sent: snapshot.total_sent,
        total_errors: snapshot.total_errors,
        total_requests: snapshot.total_requests(),
        total_duration: snapshot.total_duration,
        average_duration: snapshot.average_duration(),
        success_rate: snapshot.success_rate(),
        avg_sms_per_minute: snapshot.sent_per_minute(),
        active_workers: snapshot.active_workers,
        pool: state.engine.pool().occupancy(),
        started_at: snapshot.started_at,
        uptime_seconds: snapshot.uptime_seconds(),
    })
}
