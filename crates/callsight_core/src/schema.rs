//! The analysis result contract.
//!
//! Strict JSON protocol between the reasoning loop and the rest of the
//! system. The model is asked to answer in exactly this shape; anything it
//! actually produces goes through [`AnalysisResult::from_value`] before it is
//! allowed to claim success.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Overall customer sentiment, canonical capitalized form on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }

    /// Parse case-insensitively; "POSITIVE", "positive" and "Positive" are
    /// all the same value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown sentiment '{raw}'")))
    }
}

/// A follow-up action. Models emit either plain strings or structured task
/// objects; both are accepted and the original order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FollowUpTask {
    Text(String),
    Task {
        description: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<String>,
    },
}

/// The canonical output of one finished analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The main purpose of the call.
    pub primary_intent: String,
    /// Overall customer sentiment.
    pub sentiment: Sentiment,
    /// Emotional tone of the speaker (e.g. Polite, Frustrated).
    pub tone: String,
    /// Conversation quality score, 1-10.
    pub conversation_rating: i64,
    /// Customer requested or needs a callback.
    pub need_callback: bool,
    /// Issue requires supervisor intervention.
    pub escalation_required: bool,
    /// Suspicious keywords or behavior suggest fraud.
    pub fraud_risk: bool,
    /// Specific actions to be taken; may be empty.
    pub follow_up_tasks: Vec<FollowUpTask>,
    /// Professional summary of the interaction; may be empty.
    pub summary: String,
}

/// Why a record failed the contract.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("analysis record is not a JSON object")]
    NotAnObject,
    #[error("analysis record does not match the contract: {0}")]
    Shape(String),
    #[error("primary_intent must be non-empty")]
    EmptyIntent,
    #[error("conversation_rating {0} is outside 1-10")]
    RatingOutOfRange(i64),
}

impl AnalysisResult {
    /// Coerce an untyped record into the contract.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::NotAnObject);
        }
        let result: AnalysisResult = serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::Shape(e.to_string()))?;
        if result.primary_intent.trim().is_empty() {
            return Err(ValidationError::EmptyIntent);
        }
        if !(1..=10).contains(&result.conversation_rating) {
            return Err(ValidationError::RatingOutOfRange(result.conversation_rating));
        }
        Ok(result)
    }
}

/// One analysis request as accepted at the boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl AnalyzeRequest {
    pub fn from_transcript(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            ..Default::default()
        }
    }

    pub fn from_audio(audio_file: impl Into<String>) -> Self {
        Self {
            audio_file: Some(audio_file.into()),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// The envelope returned for every completed run.
///
/// `analysis` holds the serialized [`AnalysisResult`] when the record passed
/// validation, otherwise the best-effort raw record together with a
/// `validation_error`. A validation miss is reported, never swallowed, but by
/// itself does not fail the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub status: String,
    pub session_id: String,
    pub analysis: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl AnalysisEnvelope {
    /// A run whose record passed schema validation.
    pub fn valid(session_id: impl Into<String>, result: &AnalysisResult) -> Self {
        Self {
            status: "success".to_string(),
            session_id: session_id.into(),
            analysis: serde_json::to_value(result).unwrap_or_default(),
            validation_error: None,
        }
    }

    /// A run whose record failed validation: the best-effort record is still
    /// surfaced, tagged with the validation message.
    pub fn degraded(
        session_id: impl Into<String>,
        record: Value,
        error: &ValidationError,
    ) -> Self {
        Self {
            status: "success".to_string(),
            session_id: session_id.into(),
            analysis: record,
            validation_error: Some(error.to_string()),
        }
    }

    pub fn is_schema_valid(&self) -> bool {
        self.validation_error.is_none()
    }

    /// Re-validate the carried record (useful for clients and tests).
    pub fn result(&self) -> Result<AnalysisResult, ValidationError> {
        AnalysisResult::from_value(&self.analysis)
    }
}

/// Daemon health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
