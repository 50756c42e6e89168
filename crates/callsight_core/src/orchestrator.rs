//! The analysis orchestrator.
//!
//! One run walks INIT -> REASONING -> EXTRACTING -> VALIDATING ->
//! {SUCCESS | FALLBACK}. The reasoning loop drives a tool-calling model;
//! extraction and schema validation turn its final message into the typed
//! contract. Backend and tool failures (including the deadline) route to the
//! deterministic fallback; a mere schema miss is reported as a degraded
//! success unless `fallback_on_validation_miss` says otherwise.

use crate::config::AnalysisSettings;
use crate::error::AnalyzeError;
use crate::extract;
use crate::fallback;
use crate::llm::{ChatMessage, LlmBackend, LlmError};
use crate::prompt;
use crate::schema::{AnalysisEnvelope, AnalysisResult, AnalyzeRequest};
use crate::store::CallStore;
use crate::tools::{ToolCatalog, ToolError};
use crate::transcribe::{TranscribeError, Transcriber};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A failure inside the REASONING state. Every variant is recovered by the
/// fallback pipeline; none of them reach the caller.
#[derive(Debug, thiserror::Error)]
enum ReasoningError {
    #[error(transparent)]
    Backend(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("no final answer after {0} turns")]
    TurnLimit(usize),
}

/// The per-process analysis engine. Construct once, share across sessions;
/// it keeps no session-specific state on the backend.
pub struct AnalysisEngine {
    backend: Arc<dyn LlmBackend>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<CallStore>,
    catalog: ToolCatalog,
    settings: AnalysisSettings,
    /// Conversation contexts keyed by session id. Distinct sessions share
    /// nothing; repeated calls with the same id resume the same context.
    sessions: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl AnalysisEngine {
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<CallStore>,
        settings: AnalysisSettings,
    ) -> Self {
        let catalog = ToolCatalog::new(transcriber.clone(), store.clone());
        Self {
            backend,
            transcriber,
            store,
            catalog,
            settings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Run one end-to-end analysis.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisEnvelope, AnalyzeError> {
        // INIT: resolve the session, require some input, resolve the audio
        // reference before any tool or model call.
        let session_id = request
            .session_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let transcript = request.transcript.as_deref().filter(|t| !t.trim().is_empty());
        let audio_file = request.audio_file.as_deref().filter(|a| !a.trim().is_empty());

        if transcript.is_none() && audio_file.is_none() {
            return Err(AnalyzeError::MissingInput);
        }
        if transcript.is_none() {
            if let Some(reference) = audio_file {
                match self.transcriber.probe(reference).await {
                    Err(TranscribeError::NotFound(missing)) => {
                        return Err(AnalyzeError::AudioNotFound(missing));
                    }
                    Err(e) => warn!(session = %session_id, error = %e, "audio probe failed"),
                    Ok(()) => {}
                }
            }
        }

        info!(session = %session_id, "starting call analysis");

        // REASONING, under a single deadline. Expiry is just another backend
        // failure; no partial loop state survives it.
        let deadline = Duration::from_secs(self.settings.reasoning_timeout_secs);
        let final_text = match tokio::time::timeout(
            deadline,
            self.reason(&session_id, transcript, audio_file),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(session = %session_id, error = %e, "reasoning loop failed, falling back");
                return Ok(self.run_fallback(&session_id, transcript, audio_file).await);
            }
            Err(_) => {
                warn!(
                    session = %session_id,
                    "reasoning deadline of {}s exceeded, falling back",
                    self.settings.reasoning_timeout_secs
                );
                return Ok(self.run_fallback(&session_id, transcript, audio_file).await);
            }
        };

        // EXTRACTING: never fails, an unparseable answer becomes an empty
        // record and is judged by validation.
        let record = extract::extract_record(&final_text)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        // VALIDATING
        match AnalysisResult::from_value(&record) {
            Ok(result) => {
                info!(session = %session_id, "analysis complete");
                Ok(AnalysisEnvelope::valid(session_id, &result))
            }
            Err(e) if self.settings.fallback_on_validation_miss => {
                warn!(session = %session_id, error = %e, "schema validation failed, falling back");
                Ok(self.run_fallback(&session_id, transcript, audio_file).await)
            }
            Err(e) => {
                warn!(
                    session = %session_id,
                    error = %e,
                    "schema validation failed, returning best-effort record"
                );
                Ok(AnalysisEnvelope::degraded(session_id, record, &e))
            }
        }
    }

    /// The tool-calling loop. Returns the model's final free-text answer.
    async fn reason(
        &self,
        session_id: &str,
        transcript: Option<&str>,
        audio_file: Option<&str>,
    ) -> Result<String, ReasoningError> {
        let mut messages = self.resume_session(session_id).await;
        messages.push(ChatMessage::user(prompt::build_task_message(
            session_id, transcript, audio_file,
        )));
        let specs = self.catalog.specs();

        let mut final_text = None;
        for turn in 0..self.settings.max_turns {
            let reply = self.backend.chat(&messages, &specs).await?;
            if reply.is_final() {
                debug!(session = %session_id, turns = turn + 1, "model produced final answer");
                messages.push(ChatMessage::assistant(reply.content.clone(), Vec::new()));
                final_text = Some(reply.content);
                break;
            }

            messages.push(ChatMessage::assistant(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));
            // Tool calls run sequentially; per-session ordering is part of
            // the contract.
            for call in &reply.tool_calls {
                info!(session = %session_id, tool = %call.name, "invoking tool");
                let output = self.catalog.invoke(&call.name, &call.arguments).await?;
                messages.push(ChatMessage::tool(call.id.clone(), output.to_string()));
            }
        }

        self.store_session(session_id, messages).await;
        final_text.ok_or(ReasoningError::TurnLimit(self.settings.max_turns))
    }

    async fn resume_session(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| vec![ChatMessage::system(prompt::SYSTEM_PROMPT)])
    }

    async fn store_session(&self, session_id: &str, messages: Vec<ChatMessage>) {
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), messages);
    }

    async fn run_fallback(
        &self,
        session_id: &str,
        transcript: Option<&str>,
        audio_file: Option<&str>,
    ) -> AnalysisEnvelope {
        fallback::run(
            self.transcriber.as_ref(),
            self.store.as_ref(),
            session_id,
            transcript,
            audio_file,
        )
        .await
    }
}
