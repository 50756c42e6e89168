//! Rule-based analysis capabilities.
//!
//! Deterministic keyword heuristics over the call transcript. Every function
//! here is pure: the tool catalog exposes them to the reasoning loop, and the
//! fallback pipeline calls them directly in fixed order. Same transcript in,
//! same result out.

use crate::schema::Sentiment;
use serde::{Deserialize, Serialize};

/// Intent assigned when no category keywords match.
pub const GENERAL_INQUIRY: &str = "general_inquiry";
/// Intent that marks a call as a fraud risk.
pub const FRAUD_REPORT: &str = "fraud_report";

/// Requirement kinds referenced by the fallback assembly.
pub const CALLBACK_REQUEST: &str = "callback_request";
pub const ESCALATION: &str = "escalation";

/// Priority of a detected requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Customer sentiment label on the tool wire (upper-case form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl From<SentimentLabel> for Sentiment {
    fn from(label: SentimentLabel) -> Self {
        match label {
            SentimentLabel::Positive => Sentiment::Positive,
            SentimentLabel::Negative => Sentiment::Negative,
            SentimentLabel::Neutral => Sentiment::Neutral,
        }
    }
}

/// Result of intent classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// A follow-up requirement detected in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Priority,
    pub description: String,
}

/// Sentiment and dominant emotion reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub sentiment: SentimentLabel,
    pub score: f64,
    pub emotion: String,
}

/// Agent performance scores on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub overall_score: f64,
    pub politeness: f64,
    pub helpfulness: f64,
    pub clarity: f64,
    pub empathy: f64,
    pub reasoning: String,
}

/// Intent rules, checked in priority order; the first matching category wins.
const INTENT_RULES: &[(&str, &[&str], f64, &str)] = &[
    (
        "loan_repayment_query",
        &["loan", "repayment", "emi"],
        0.9,
        "Keywords related to loans detected",
    ),
    (
        FRAUD_REPORT,
        &["fraud", "unauthorized", "scam"],
        0.9,
        "Fraud keywords detected",
    ),
    (
        "balance_inquiry",
        &["balance", "account statement"],
        0.85,
        "Balance keywords detected",
    ),
    (
        "credit_card_request",
        &["credit card", "new card"],
        0.85,
        "Credit card keywords detected",
    ),
    (
        "technical_support",
        &["app not working", "website down", "login issue", "cannot log in"],
        0.8,
        "Technical problem keywords detected",
    ),
    (
        "complaint",
        &["complaint", "terrible service", "worst experience"],
        0.8,
        "Complaint keywords detected",
    ),
];

/// Classify the primary intent of a call transcript.
pub fn classify_intent(transcript: &str) -> IntentResult {
    let lower = transcript.to_lowercase();
    for (intent, keywords, confidence, reasoning) in INTENT_RULES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return IntentResult {
                intent: (*intent).to_string(),
                confidence: *confidence,
                reasoning: (*reasoning).to_string(),
            };
        }
    }
    IntentResult {
        intent: GENERAL_INQUIRY.to_string(),
        confidence: 0.5,
        reasoning: "No category keywords matched; default classification".to_string(),
    }
}

/// Requirement checks in fixed order; each check contributes at most one
/// entry, so output order is check order, not input order.
const REQUIREMENT_CHECKS: &[(&str, Priority, &[&str], &str)] = &[
    (
        "document_upload",
        Priority::Medium,
        &["document", "upload", "submit", "proof"],
        "Needs to submit verification documents",
    ),
    (
        CALLBACK_REQUEST,
        Priority::Medium,
        &["call back", "callback", "call me", "reach out"],
        "Customer requested a call back",
    ),
    (
        ESCALATION,
        Priority::High,
        &["supervisor", "manager", "escalate"],
        "Requested supervisor attention",
    ),
    (
        "payment_plan",
        Priority::Medium,
        &["payment plan", "installment", "split payment", "afford"],
        "Customer asked about restructuring payments",
    ),
    (
        "technical_issue",
        Priority::High,
        &["app not working", "website down", "login issue", "error message"],
        "Customer reported a technical problem",
    ),
    (
        "account_update",
        Priority::Low,
        &["update address", "change number", "update details"],
        "Customer asked to update account details",
    ),
];

/// Identify follow-up actions mentioned in the transcript.
pub fn detect_requirements(transcript: &str) -> Vec<Requirement> {
    let lower = transcript.to_lowercase();
    REQUIREMENT_CHECKS
        .iter()
        .filter(|(_, _, keywords, _)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(kind, priority, _, description)| Requirement {
            kind: (*kind).to_string(),
            priority: *priority,
            description: (*description).to_string(),
        })
        .collect()
}

const NEGATIVE_WORDS: &[&str] = &[
    "angry",
    "upset",
    "frustrated",
    "bad",
    "terrible",
    "awful",
    "disappointed",
];

const POSITIVE_WORDS: &[&str] = &["thank", "great", "happy", "appreciate", "wonderful"];

/// Read customer sentiment and the dominant emotion. The first matching
/// keyword family wins: NEGATIVE over POSITIVE over the NEUTRAL default.
pub fn analyze_sentiment(transcript: &str) -> SentimentReading {
    let lower = transcript.to_lowercase();
    if NEGATIVE_WORDS.iter().any(|w| lower.contains(w)) {
        return SentimentReading {
            sentiment: SentimentLabel::Negative,
            score: 0.8,
            emotion: "frustration".to_string(),
        };
    }
    if POSITIVE_WORDS.iter().any(|w| lower.contains(w)) {
        return SentimentReading {
            sentiment: SentimentLabel::Positive,
            score: 0.8,
            emotion: "contentment".to_string(),
        };
    }
    SentimentReading {
        sentiment: SentimentLabel::Neutral,
        score: 0.5,
        emotion: "neutral".to_string(),
    }
}

const BASE_SCORE: f64 = 75.0;
const NEGATIVE_SENTIMENT_PENALTY: f64 = 5.0;
const APOLOGY_BONUS: f64 = 10.0;

const POLITE_WORDS: &[&str] = &[
    "please",
    "thank",
    "appreciate",
    "welcome",
    "happy to help",
    "certainly",
    "of course",
    "glad",
    "sorry",
];

const HELPFUL_PHRASES: &[&str] = &[
    "i can help",
    "let me",
    "i will",
    "solution",
    "resolve",
    "assist",
    "fix",
    "handle",
    "take care",
];

const EMPATHY_WORDS: &[&str] = &[
    "understand",
    "apologize",
    "sorry",
    "appreciate your patience",
    "i see",
    "frustrating",
    "difficult",
];

/// Score the agent's performance. Overall is a base score adjusted for
/// customer sentiment and apology language, clamped at 100; the component
/// scores come from keyword coverage and sentence-length clarity.
pub fn score_agent_performance(transcript: &str, sentiment: SentimentLabel) -> AgentScore {
    let lower = transcript.to_lowercase();

    let mut overall = BASE_SCORE;
    if sentiment == SentimentLabel::Negative {
        overall -= NEGATIVE_SENTIMENT_PENALTY;
    }
    if lower.contains("apologize") || lower.contains("sorry") {
        overall += APOLOGY_BONUS;
    }

    AgentScore {
        overall_score: overall.min(100.0),
        politeness: keyword_coverage(&lower, POLITE_WORDS, 5.0) * 100.0,
        helpfulness: keyword_coverage(&lower, HELPFUL_PHRASES, 4.0) * 100.0,
        clarity: clarity_score(transcript) * 100.0,
        empathy: empathy_score(&lower, sentiment) * 100.0,
        reasoning: "Keyword heuristics adjusted for customer sentiment".to_string(),
    }
}

fn keyword_coverage(lower: &str, words: &[&str], denominator: f64) -> f64 {
    let count = words.iter().filter(|w| lower.contains(*w)).count() as f64;
    (count / denominator).min(1.0)
}

/// Clarity from mean sentence length: 10-20 words is ideal.
fn clarity_score(transcript: &str) -> f64 {
    let lengths: Vec<usize> = transcript
        .split('.')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.split_whitespace().count())
        .collect();
    if lengths.is_empty() {
        return 0.8;
    }
    let avg = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    if (10.0..=20.0).contains(&avg) {
        1.0
    } else if avg < 10.0 {
        0.8
    } else {
        (1.0 - (avg - 20.0) / 100.0).max(0.5)
    }
}

/// Empathy counts weigh more when the customer is upset.
fn empathy_score(lower: &str, sentiment: SentimentLabel) -> f64 {
    let count = EMPATHY_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    if sentiment == SentimentLabel::Negative && count > 0.0 {
        return ((count / 3.0) * 1.2).min(1.0);
    }
    (count / 3.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_keywords_win_first() {
        let result = classify_intent("I need help with my loan payment");
        assert_eq!(result.intent, "loan_repayment_query");
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn test_fraud_keywords_classify_as_fraud_report() {
        let result = classify_intent("There is an unauthorized charge, I think it is fraud");
        assert_eq!(result.intent, FRAUD_REPORT);
    }

    #[test]
    fn test_unmatched_transcript_defaults_to_general_inquiry() {
        let result = classify_intent("Hello, just checking in");
        assert_eq!(result.intent, GENERAL_INQUIRY);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_rule_order_breaks_ties() {
        // Both loan and fraud keywords present; loan is checked first.
        let result = classify_intent("Someone took a fraudulent loan in my name");
        assert_eq!(result.intent, "loan_repayment_query");
    }

    #[test]
    fn test_manager_and_callback_detected_with_priorities() {
        let reqs =
            detect_requirements("I want to speak to a manager, and please call back tomorrow");
        let kinds: Vec<&str> = reqs.iter().map(|r| r.kind.as_str()).collect();
        assert!(kinds.contains(&ESCALATION));
        assert!(kinds.contains(&CALLBACK_REQUEST));

        let escalation = reqs.iter().find(|r| r.kind == ESCALATION).unwrap();
        assert_eq!(escalation.priority, Priority::High);
        let callback = reqs.iter().find(|r| r.kind == CALLBACK_REQUEST).unwrap();
        assert_eq!(callback.priority, Priority::Medium);
    }

    #[test]
    fn test_requirement_order_is_check_order() {
        // Mentioned in reverse order in the text; output follows check order.
        let reqs = detect_requirements("Escalate this to a manager. Also I must upload a document");
        assert_eq!(reqs[0].kind, "document_upload");
        assert_eq!(reqs[1].kind, ESCALATION);
    }

    #[test]
    fn test_no_requirements_for_plain_transcript() {
        assert!(detect_requirements("What time do you open?").is_empty());
    }

    #[test]
    fn test_negative_family_beats_positive() {
        let reading = analyze_sentiment("I am upset, but thank you for listening");
        assert_eq!(reading.sentiment, SentimentLabel::Negative);
        assert_eq!(reading.emotion, "frustration");
    }

    #[test]
    fn test_neutral_is_the_default_sentiment() {
        let reading = analyze_sentiment("I am calling about my account");
        assert_eq!(reading.sentiment, SentimentLabel::Neutral);
        assert_eq!(reading.score, 0.5);
    }

    #[test]
    fn test_agent_score_adjustments() {
        let neutral = score_agent_performance("We will look into it", SentimentLabel::Neutral);
        assert_eq!(neutral.overall_score, 75.0);

        let negative = score_agent_performance("We will look into it", SentimentLabel::Negative);
        assert_eq!(negative.overall_score, 70.0);

        let apologetic =
            score_agent_performance("I am sorry, we will fix this", SentimentLabel::Negative);
        assert_eq!(apologetic.overall_score, 80.0);
    }

    #[test]
    fn test_agent_score_is_clamped() {
        // Apology bonus on a neutral call: 75 + 10, still within bounds, and
        // the clamp keeps any future adjustment from exceeding 100.
        let score = score_agent_performance("sorry about that", SentimentLabel::Neutral);
        assert!(score.overall_score <= 100.0);
        assert_eq!(score.overall_score, 85.0);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let text = "Agent: I understand, I am sorry. Customer: I am upset, call me back.";
        let first = (
            classify_intent(text),
            detect_requirements(text),
            analyze_sentiment(text),
        );
        let second = (
            classify_intent(text),
            detect_requirements(text),
            analyze_sentiment(text),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_sentiment_label_parse() {
        assert_eq!(SentimentLabel::parse("NEGATIVE"), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("positive"), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("odd"), None);
    }
}
