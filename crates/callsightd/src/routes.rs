//! API routes for callsightd.
//!
//! The analyze route is the orchestrator boundary: the only errors that map
//! to failure status codes are missing input (400) and an unresolvable audio
//! reference (404). Everything else the engine degrades internally.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use callsight_core::schema::HealthResponse;
use callsight_core::store::{CallReport, StoreStats};
use callsight_core::{AnalysisEnvelope, AnalyzeError, AnalyzeRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

type AppStateArc = Arc<AppState>;

/// Error payload for failed requests.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: String,
    pub error: String,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(code: StatusCode, message: impl Into<String>) -> ApiError {
    (code, Json(ErrorBody::new(message)))
}

// ============================================================================
// Analyze
// ============================================================================

pub fn analyze_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/analyze", post(analyze_call))
}

async fn analyze_call(
    State(state): State<AppStateArc>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisEnvelope>, ApiError> {
    match state.engine.analyze(request).await {
        Ok(envelope) => Ok(Json(envelope)),
        Err(e @ AnalyzeError::MissingInput) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ AnalyzeError::AudioNotFound(_)) => {
            Err(api_error(StatusCode::NOT_FOUND, e.to_string()))
        }
    }
}

// ============================================================================
// Reports and stats
// ============================================================================

pub fn report_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/calls/:session_id", get(call_report))
        .route("/v1/stats", get(stats))
}

async fn call_report(
    State(state): State<AppStateArc>,
    Path(session_id): Path<String>,
) -> Result<Json<CallReport>, ApiError> {
    match state.store.fetch_report(&session_id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("no call recorded for session {session_id}"),
        )),
        Err(e) => {
            error!(session = %session_id, error = %e, "report lookup failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn stats(State(state): State<AppStateArc>) -> Result<Json<StoreStats>, ApiError> {
    match state.store.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            error!(error = %e, "stats query failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ============================================================================
// Health
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
