//! Deterministic fakes for orchestration tests.
//!
//! These mirror the production seams: [`FakeBackend`] implements
//! [`LlmBackend`] with a fixed script of turns, [`FixtureTranscriber`] serves
//! canned transcripts. No network, no model, no audio files.

use crate::llm::{ChatMessage, ChatTurn, LlmBackend, LlmError, ToolCallRequest};
use crate::tools::ToolSpec;
use crate::transcribe::{TranscribeError, Transcriber, Transcription};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A scripted reasoning backend. Turns are served in order; once the script
/// runs dry every further call fails like an unreachable backend.
#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<VecDeque<Result<ChatTurn, LlmError>>>,
    calls: AtomicUsize,
    message_counts: Mutex<Vec<usize>>,
}

impl FakeBackend {
    pub fn new(turns: Vec<Result<ChatTurn, LlmError>>) -> Self {
        Self {
            script: Mutex::new(turns.into()),
            calls: AtomicUsize::new(0),
            message_counts: Mutex::new(Vec::new()),
        }
    }

    /// A backend that immediately answers with `text`.
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(ChatTurn {
            content: text.into(),
            tool_calls: Vec::new(),
        })])
    }

    /// A backend whose every call fails.
    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    /// A scripted tool-call turn.
    pub fn tool_turn(calls: Vec<ToolCallRequest>) -> Result<ChatTurn, LlmError> {
        Ok(ChatTurn {
            content: String::new(),
            tool_calls: calls,
        })
    }

    pub fn tool_call(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: format!("call_{name}"),
            name: name.to_string(),
            arguments,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message-stack length seen at each call, in call order.
    pub fn message_counts(&self) -> Vec<usize> {
        self.message_counts.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl LlmBackend for FakeBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ChatTurn, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.message_counts
            .lock()
            .expect("lock poisoned")
            .push(messages.len());
        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Http("scripted backend exhausted".to_string())))
    }
}

/// A transcriber serving canned transcripts by reference.
#[derive(Default)]
pub struct FixtureTranscriber {
    fixtures: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FixtureTranscriber {
    pub fn with_fixture(reference: &str, transcript: &str) -> Self {
        let mut fixtures = HashMap::new();
        fixtures.insert(reference.to_string(), transcript.to_string());
        Self {
            fixtures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn transcribe_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FixtureTranscriber {
    async fn probe(&self, reference: &str) -> Result<(), TranscribeError> {
        if self.fixtures.contains_key(reference) {
            Ok(())
        } else {
            Err(TranscribeError::NotFound(reference.to_string()))
        }
    }

    async fn transcribe(&self, reference: &str) -> Result<Transcription, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fixtures.get(reference) {
            Some(text) => Ok(Transcription {
                text: text.clone(),
                duration_secs: 42.0,
            }),
            None => Err(TranscribeError::NotFound(reference.to_string())),
        }
    }
}
