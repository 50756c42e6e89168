//! Callsight daemon entry point.
//!
//! Wires the configured backend, transcriber and store into one analysis
//! engine and serves it over HTTP.

use anyhow::Result;
use callsight_core::config::CallsightConfig;
use callsight_core::llm::HttpOpenAiBackend;
use callsight_core::store::CallStore;
use callsight_core::transcribe::HttpWhisperTranscriber;
use callsight_core::AnalysisEngine;
use callsightd::server::{self, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("callsightd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = CallsightConfig::load();

    let store = Arc::new(CallStore::open(&config.storage.db_path).await?);
    let backend = Arc::new(HttpOpenAiBackend::from_settings(&config.llm)?);
    let transcriber = Arc::new(HttpWhisperTranscriber::new(
        &config.transcribe.base_url,
        config.transcribe.request_timeout_secs,
    )?);
    let engine = Arc::new(AnalysisEngine::new(
        backend,
        transcriber,
        store.clone(),
        config.analysis.clone(),
    ));
    info!(
        model = %config.llm.model,
        backend = %config.llm.base_url,
        "analysis engine ready"
    );

    let state = AppState::new(engine, store);
    server::run(state, &config.server.bind_addr).await
}
