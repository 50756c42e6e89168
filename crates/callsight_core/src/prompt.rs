//! System instruction for the reasoning loop.
//!
//! The instruction expresses the preferred capability order and the exact
//! output contract. The model is not force-constrained: the orchestrator
//! tolerates any call order, including omitted steps.

/// Fixed workflow instruction handed to the model once per session.
pub const SYSTEM_PROMPT: &str = r#"You are an expert banking call analysis orchestrator.
Your goal is to perform a complete end-to-end analysis of a customer service interaction.

REQUIRED WORKFLOW:
1. TRANSCRIPTION: If an audio file path is provided, use 'transcribe_audio' to get the text.
2. INTENT: Use 'classify_intent' to identify why the customer is calling.
3. REQUIREMENTS: Use 'detect_requirements' to find follow-up actions.
4. SENTIMENT: Use 'analyze_sentiment' to evaluate the customer's mood.
5. AGENT SCORING: Use 'score_agent_performance' to rate the representative.
6. PERSISTENCE: Use 'save_to_database' to store all results. This is your FINAL tool call.

The session id given in the task must be passed to 'save_to_database'.
If a transcript is provided directly, SKIP the transcription step.

OUTPUT FORMAT:
Your final response MUST be a single JSON object with no text outside it,
strictly following this structure:
{
    "primary_intent": "string",
    "sentiment": "Positive" | "Negative" | "Neutral",
    "tone": "string",
    "conversation_rating": 1-10,
    "need_callback": true | false,
    "escalation_required": true | false,
    "fraud_risk": true | false,
    "follow_up_tasks": ["string"],
    "summary": "string"
}"#;

/// Build the per-run task message. The transcript wins when both inputs are
/// present; the audio reference is only mentioned when there is no text yet.
pub fn build_task_message(
    session_id: &str,
    transcript: Option<&str>,
    audio_file: Option<&str>,
) -> String {
    let mut message = format!("Analyze this interaction. Session ID: {session_id}. ");
    if let Some(text) = transcript {
        message.push_str(&format!("Transcript: {text}"));
    } else if let Some(reference) = audio_file {
        message.push_str(&format!("Audio file: {reference}"));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_tool() {
        for tool in [
            "transcribe_audio",
            "classify_intent",
            "detect_requirements",
            "analyze_sentiment",
            "score_agent_performance",
            "save_to_database",
        ] {
            assert!(SYSTEM_PROMPT.contains(tool), "prompt must mention {tool}");
        }
    }

    #[test]
    fn test_task_message_prefers_transcript() {
        let message = build_task_message("s-1", Some("hello"), Some("call.wav"));
        assert!(message.contains("Transcript: hello"));
        assert!(!message.contains("call.wav"));
    }

    #[test]
    fn test_task_message_with_audio_only() {
        let message = build_task_message("s-1", None, Some("call.wav"));
        assert!(message.contains("Audio file: call.wav"));
        assert!(message.contains("Session ID: s-1"));
    }
}
