//! HTTP client for the callsightd API.

use anyhow::{anyhow, Result};
use callsight_core::schema::HealthResponse;
use callsight_core::store::{CallReport, StoreStats};
use callsight_core::{AnalysisEnvelope, AnalyzeRequest};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Analysis can take a while when the model is cold; keep the client patient.
const REQUEST_TIMEOUT_SECS: u64 = 300;

pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn analyze(
        &self,
        transcript: Option<String>,
        audio_file: Option<String>,
        session_id: Option<String>,
    ) -> Result<AnalysisEnvelope> {
        let request = AnalyzeRequest {
            transcript,
            audio_file,
            session_id,
        };
        let response = self
            .http
            .post(format!("{}/v1/analyze", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("daemon unavailable at {}: {e}", self.base_url))?;
        Self::decode(response).await
    }

    pub async fn report(&self, session_id: &str) -> Result<CallReport> {
        self.get(&format!("/v1/calls/{session_id}")).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.get("/v1/stats").await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/v1/health").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| anyhow!("daemon unavailable at {}: {e}", self.base_url))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the daemon's structured error message when present
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(anyhow!("daemon returned {status}: {detail}"));
        }
        Ok(response.json().await?)
    }
}
