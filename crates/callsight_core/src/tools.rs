//! Capability tool registry for the reasoning loop.
//!
//! A fixed registry of named capabilities with declared parameter schemas.
//! The model sees names and descriptions only; dispatch and execution stay
//! here. Unknown tools and malformed arguments are answered back to the model
//! as error payloads so it can correct itself; transcription failures abort
//! the reasoning loop; persistence failures are converted into an "ERROR"
//! confirmation string and never abort a run.

use crate::analysis::{
    analyze_sentiment, classify_intent, detect_requirements, score_agent_performance, Requirement,
    SentimentLabel,
};
use crate::store::{CallRecord, CallStore};
use crate::transcribe::{TranscribeError, Transcriber};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const TRANSCRIBE_AUDIO: &str = "transcribe_audio";
pub const CLASSIFY_INTENT: &str = "classify_intent";
pub const DETECT_REQUIREMENTS: &str = "detect_requirements";
pub const ANALYZE_SENTIMENT: &str = "analyze_sentiment";
pub const SCORE_AGENT_PERFORMANCE: &str = "score_agent_performance";
pub const SAVE_TO_DATABASE: &str = "save_to_database";

/// A tool as advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// A tool failure that aborts the reasoning loop.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

/// The capability catalog, bound to its collaborators.
pub struct ToolCatalog {
    transcriber: Arc<dyn Transcriber>,
    store: Arc<CallStore>,
}

impl ToolCatalog {
    pub fn new(transcriber: Arc<dyn Transcriber>, store: Arc<CallStore>) -> Self {
        Self { transcriber, store }
    }

    /// The registry as advertised to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: TRANSCRIBE_AUDIO,
                description: "Transcribe an audio file to text. Use this first if an audio \
                              file path is provided instead of a transcript.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "audio_file_path": {
                            "type": "string",
                            "description": "Path of the audio file to transcribe"
                        }
                    },
                    "required": ["audio_file_path"]
                }),
            },
            ToolSpec {
                name: CLASSIFY_INTENT,
                description: "Classify the primary intent of a banking call transcript. \
                              Categories include loan_repayment_query, fraud_report, \
                              balance_inquiry, complaint and general_inquiry.",
                parameters: transcript_parameters(),
            },
            ToolSpec {
                name: DETECT_REQUIREMENTS,
                description: "Identify follow-up actions (requirements) from the transcript, \
                              such as document_upload, callback_request, escalation or \
                              payment_plan.",
                parameters: transcript_parameters(),
            },
            ToolSpec {
                name: ANALYZE_SENTIMENT,
                description: "Analyze customer sentiment and primary emotion from the \
                              transcript. Sentiments: POSITIVE, NEGATIVE, NEUTRAL.",
                parameters: transcript_parameters(),
            },
            ToolSpec {
                name: SCORE_AGENT_PERFORMANCE,
                description: "Score the customer service agent's performance on a 0-100 \
                              scale. Evaluates politeness, helpfulness, clarity and empathy.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "transcript": {
                            "type": "string",
                            "description": "Full call transcript text"
                        },
                        "sentiment": {
                            "type": "string",
                            "description": "Customer sentiment (POSITIVE, NEGATIVE or NEUTRAL)"
                        }
                    },
                    "required": ["transcript"]
                }),
            },
            ToolSpec {
                name: SAVE_TO_DATABASE,
                description: "Save all analysis results to the call database. This should \
                              be the FINAL step of the analysis pipeline.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "transcript": {"type": "string"},
                        "intent": {"type": "string"},
                        "requirements": {
                            "type": "array",
                            "items": {"type": "object"},
                            "description": "Requirements as returned by detect_requirements"
                        },
                        "sentiment": {"type": "string"},
                        "agent_score": {"type": "number"},
                        "session_id": {"type": "string"}
                    },
                    "required": ["transcript", "intent", "sentiment", "agent_score", "session_id"]
                }),
            },
        ]
    }

    /// Invoke a tool by name with the model's arguments.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        match name {
            TRANSCRIBE_AUDIO => {
                let Some(path) = str_arg(arguments, "audio_file_path") else {
                    return Ok(missing_argument(name, "audio_file_path"));
                };
                let transcription = self.transcriber.transcribe(path).await?;
                info!(
                    reference = %path,
                    duration_secs = transcription.duration_secs,
                    "transcribed audio"
                );
                Ok(json!(transcription.text))
            }
            CLASSIFY_INTENT => {
                let Some(transcript) = str_arg(arguments, "transcript") else {
                    return Ok(missing_argument(name, "transcript"));
                };
                Ok(json!(classify_intent(transcript)))
            }
            DETECT_REQUIREMENTS => {
                let Some(transcript) = str_arg(arguments, "transcript") else {
                    return Ok(missing_argument(name, "transcript"));
                };
                Ok(json!(detect_requirements(transcript)))
            }
            ANALYZE_SENTIMENT => {
                let Some(transcript) = str_arg(arguments, "transcript") else {
                    return Ok(missing_argument(name, "transcript"));
                };
                Ok(json!(analyze_sentiment(transcript)))
            }
            SCORE_AGENT_PERFORMANCE => {
                let Some(transcript) = str_arg(arguments, "transcript") else {
                    return Ok(missing_argument(name, "transcript"));
                };
                let sentiment = str_arg(arguments, "sentiment")
                    .and_then(SentimentLabel::parse)
                    .unwrap_or(SentimentLabel::Neutral);
                Ok(json!(score_agent_performance(transcript, sentiment)))
            }
            SAVE_TO_DATABASE => Ok(json!(self.save_to_database(arguments).await)),
            _ => {
                warn!(tool = %name, "model requested an unknown tool");
                Ok(json!({"error": format!("unknown tool: {name}")}))
            }
        }
    }

    /// Persist the analysis. Storage failures become an "ERROR" confirmation
    /// string: persistence must never erase an otherwise valid analysis.
    async fn save_to_database(&self, arguments: &Value) -> String {
        let Some(session_id) = str_arg(arguments, "session_id") else {
            return "ERROR: missing required argument 'session_id'".to_string();
        };
        let requirements: Vec<Requirement> = arguments
            .get("requirements")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let record = CallRecord {
            session_id: session_id.to_string(),
            transcript: str_arg(arguments, "transcript").unwrap_or("").to_string(),
            intent: str_arg(arguments, "intent").unwrap_or("").to_string(),
            sentiment: str_arg(arguments, "sentiment").unwrap_or("NEUTRAL").to_string(),
            agent_score: arguments
                .get("agent_score")
                .and_then(|s| s.as_f64())
                .unwrap_or(0.0),
            duration_secs: 0.0,
        };

        match self.store.save_analysis(record, requirements).await {
            Ok(call_id) => {
                info!(session = %session_id, call_id, "analysis persisted");
                format!("SUCCESS: call analysis saved with id {call_id}")
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "failed to persist analysis");
                format!("ERROR: failed to save analysis: {e}")
            }
        }
    }
}

fn transcript_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "transcript": {
                "type": "string",
                "description": "Full call transcript text"
            }
        },
        "required": ["transcript"]
    })
}

fn str_arg<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(|v| v.as_str())
}

fn missing_argument(tool: &str, key: &str) -> Value {
    json!({"error": format!("missing required argument '{key}' for {tool}")})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixtureTranscriber;

    async fn catalog() -> (ToolCatalog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CallStore::open(dir.path().join("calls.db")).await.unwrap());
        let transcriber = Arc::new(FixtureTranscriber::default());
        (ToolCatalog::new(transcriber, store), dir)
    }

    #[tokio::test]
    async fn test_specs_cover_all_tools() {
        let (catalog, _dir) = catalog().await;
        let names: Vec<&str> = catalog.specs().iter().map(|s| s.name).collect();
        for expected in [
            TRANSCRIBE_AUDIO,
            CLASSIFY_INTENT,
            DETECT_REQUIREMENTS,
            ANALYZE_SENTIMENT,
            SCORE_AGENT_PERFORMANCE,
            SAVE_TO_DATABASE,
        ] {
            assert!(names.contains(&expected), "missing spec for {expected}");
        }
    }

    #[tokio::test]
    async fn test_classify_intent_dispatch() {
        let (catalog, _dir) = catalog().await;
        let output = catalog
            .invoke(CLASSIFY_INTENT, &json!({"transcript": "problem with my loan"}))
            .await
            .unwrap();
        assert_eq!(output["intent"], json!("loan_repayment_query"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_answered_inline() {
        let (catalog, _dir) = catalog().await;
        let output = catalog.invoke("read_email", &json!({})).await.unwrap();
        assert!(output["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_answered_inline() {
        let (catalog, _dir) = catalog().await;
        let output = catalog.invoke(CLASSIFY_INTENT, &json!({})).await.unwrap();
        assert!(output["error"].as_str().unwrap().contains("transcript"));
    }

    #[tokio::test]
    async fn test_transcribe_missing_audio_aborts() {
        let (catalog, _dir) = catalog().await;
        let err = catalog
            .invoke(TRANSCRIBE_AUDIO, &json!({"audio_file_path": "nope.wav"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Transcribe(TranscribeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_returns_success_marker() {
        let (catalog, _dir) = catalog().await;
        let output = catalog
            .invoke(
                SAVE_TO_DATABASE,
                &json!({
                    "transcript": "hello",
                    "intent": "general_inquiry",
                    "requirements": [],
                    "sentiment": "NEUTRAL",
                    "agent_score": 75.0,
                    "session_id": "s-save"
                }),
            )
            .await
            .unwrap();
        assert!(output.as_str().unwrap().starts_with("SUCCESS"));
    }

    #[tokio::test]
    async fn test_score_defaults_to_neutral_sentiment() {
        let (catalog, _dir) = catalog().await;
        let output = catalog
            .invoke(SCORE_AGENT_PERFORMANCE, &json!({"transcript": "let me assist"}))
            .await
            .unwrap();
        assert_eq!(output["overall_score"], json!(75.0));
    }
}
