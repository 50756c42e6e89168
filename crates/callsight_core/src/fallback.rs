//! Deterministic, model-free analysis pipeline.
//!
//! The availability floor: a fixed capability sequence that assembles a
//! schema-valid result with no reasoning backend involved. Identical input
//! produces an identical result.

use crate::analysis::{
    analyze_sentiment, classify_intent, detect_requirements, score_agent_performance,
    CALLBACK_REQUEST, ESCALATION, FRAUD_REPORT,
};
use crate::schema::{AnalysisEnvelope, AnalysisResult, FollowUpTask};
use crate::store::{CallRecord, CallStore};
use crate::transcribe::Transcriber;
use tracing::warn;

/// Run the fallback pipeline for one session.
pub async fn run(
    transcriber: &dyn Transcriber,
    store: &CallStore,
    session_id: &str,
    transcript: Option<&str>,
    audio_file: Option<&str>,
) -> AnalysisEnvelope {
    warn!(session = %session_id, "running deterministic fallback pipeline");

    let (text, duration_secs) = match (transcript, audio_file) {
        (Some(text), _) => (text.to_string(), 0.0),
        (None, Some(reference)) => match transcriber.transcribe(reference).await {
            Ok(transcription) => (transcription.text, transcription.duration_secs),
            Err(e) => {
                // Even a dead transcription backend must not take the floor
                // down with it; analyze what we have.
                warn!(session = %session_id, error = %e, "fallback transcription failed");
                (String::new(), 0.0)
            }
        },
        (None, None) => (String::new(), 0.0),
    };

    let intent = classify_intent(&text);
    let requirements = detect_requirements(&text);
    let reading = analyze_sentiment(&text);
    let score = score_agent_performance(&text, reading.sentiment);

    let rating = ((score.overall_score / 10.0).floor() as i64).clamp(1, 10);
    let result = AnalysisResult {
        primary_intent: intent.intent.clone(),
        sentiment: reading.sentiment.into(),
        tone: "Professional".to_string(),
        conversation_rating: rating,
        need_callback: requirements.iter().any(|r| r.kind == CALLBACK_REQUEST),
        escalation_required: requirements.iter().any(|r| r.kind == ESCALATION),
        fraud_risk: intent.intent == FRAUD_REPORT,
        follow_up_tasks: requirements
            .iter()
            .map(|r| FollowUpTask::Text(r.description.clone()))
            .collect(),
        summary: "Rule-based analysis performed because the reasoning backend was unavailable."
            .to_string(),
    };

    // Best-effort persistence; a storage failure never erases the analysis.
    let record = CallRecord {
        session_id: session_id.to_string(),
        transcript: text,
        intent: intent.intent,
        sentiment: reading.sentiment.as_str().to_string(),
        agent_score: score.overall_score,
        duration_secs,
    };
    if let Err(e) = store.save_analysis(record, requirements).await {
        warn!(session = %session_id, error = %e, "fallback persistence failed");
    }

    AnalysisEnvelope::valid(session_id, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Sentiment;
    use crate::testing::FixtureTranscriber;
    use std::sync::Arc;

    async fn store() -> (Arc<CallStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CallStore::open(dir.path().join("calls.db")).await.unwrap());
        (store, dir)
    }

    #[tokio::test]
    async fn test_manager_and_callback_scenario() {
        let (store, _dir) = store().await;
        let transcriber = FixtureTranscriber::default();
        let transcript = "I am upset. I want to talk to a manager. Please call back tomorrow.";

        let envelope = run(&transcriber, &store, "s-a", Some(transcript), None).await;
        let result = envelope.result().unwrap();
        assert!(result.need_callback);
        assert!(result.escalation_required);
        assert!(!result.fraud_risk);
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.follow_up_tasks.len(), 2);

        // The run was persisted with its tickets.
        let report = store.fetch_report("s-a").await.unwrap().unwrap();
        assert_eq!(report.tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_fraud_scenario() {
        let (store, _dir) = store().await;
        let transcriber = FixtureTranscriber::default();

        let envelope = run(
            &transcriber,
            &store,
            "s-b",
            Some("I want to report fraud on my card"),
            None,
        )
        .await;
        let result = envelope.result().unwrap();
        assert_eq!(result.primary_intent, FRAUD_REPORT);
        assert!(result.fraud_risk);
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let (store, _dir) = store().await;
        let transcriber = FixtureTranscriber::default();
        let transcript = "Agent: I am sorry. Customer: my loan is overdue, call me back.";

        let first = run(&transcriber, &store, "s-c", Some(transcript), None).await;
        let second = run(&transcriber, &store, "s-c", Some(transcript), None).await;
        assert_eq!(first.analysis, second.analysis);
    }

    #[tokio::test]
    async fn test_rating_derived_from_agent_score() {
        let (store, _dir) = store().await;
        let transcriber = FixtureTranscriber::default();

        // Neutral call, no apology: overall 75 -> rating 7.
        let envelope = run(&transcriber, &store, "s-d", Some("checking my balance"), None).await;
        let result = envelope.result().unwrap();
        assert_eq!(result.conversation_rating, 7);
    }

    #[tokio::test]
    async fn test_transcribes_audio_when_no_transcript() {
        let (store, _dir) = store().await;
        let transcriber =
            FixtureTranscriber::with_fixture("call.wav", "thank you for the quick help");

        let envelope = run(&transcriber, &store, "s-e", None, Some("call.wav")).await;
        let result = envelope.result().unwrap();
        assert_eq!(result.sentiment, Sentiment::Positive);

        let report = store.fetch_report("s-e").await.unwrap().unwrap();
        assert!(report.duration_secs > 0.0);
    }

    #[tokio::test]
    async fn test_dead_transcriber_still_yields_valid_result() {
        let (store, _dir) = store().await;
        let transcriber = FixtureTranscriber::default();

        let envelope = run(&transcriber, &store, "s-f", None, Some("gone.wav")).await;
        assert!(envelope.result().is_ok());
    }
}
