//! HTTP server for callsightd.

use crate::routes;
use anyhow::Result;
use axum::Router;
use callsight_core::store::CallStore;
use callsight_core::AnalysisEngine;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
    pub store: Arc<CallStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<AnalysisEngine>, store: Arc<CallStore>) -> Self {
        Self {
            engine,
            store,
            start_time: Instant::now(),
        }
    }
}

/// Build the full router. Split out so tests can drive it in-process.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::analyze_routes())
        .merge(routes::report_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
