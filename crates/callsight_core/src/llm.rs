//! LLM backend abstraction and the OpenAI-compatible HTTP adapter.
//!
//! The orchestrator depends only on the [`LlmBackend`] trait: given a message
//! history and a tool registry, return either tool calls or a final answer.
//! Any backend implementing that contract can drive the reasoning loop, which
//! is what keeps the state machine independent of the model behind it.

use crate::config::LlmSettings;
use crate::tools::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

/// A single message in the reasoning conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", "assistant" or "tool".
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One model turn: tool calls to execute, or a final free-text answer.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatTurn {
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("malformed backend response: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// A reasoning backend: given a conversation and the available tools, return
/// the model's next turn.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec])
        -> Result<ChatTurn, LlmError>;
}

/// OpenAI-compatible `/chat/completions` backend with tool calling. Works
/// against Ollama's compatibility endpoint as well as hosted APIs.
pub struct HttpOpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl HttpOpenAiBackend {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = match &settings.api_key_env {
            Some(var) => match env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    return Err(LlmError::Config(format!(
                        "API key env var {var} is not set"
                    )))
                }
            },
            // Local servers need no key
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl LlmBackend for HttpOpenAiBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatTurn, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let wire_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        let wire_messages: Vec<Value> = messages.iter().map(to_wire_message).collect();

        let body = json!({
            "model": self.model,
            "messages": wire_messages,
            "tools": wire_tools,
            "max_tokens": self.max_tokens,
            "temperature": 0,
        });

        let mut request = self.client.post(&url).header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("HTTP {status}: {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Protocol(format!("failed to parse response: {e}")))?;

        parse_chat_turn(&payload)
    }
}

fn to_wire_message(message: &ChatMessage) -> Value {
    let mut wire = json!({
        "role": message.role,
        "content": message.content,
    });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        // Arguments travel as a JSON-encoded string on the wire
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect::<Vec<_>>()
            .into();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

fn parse_chat_turn(payload: &Value) -> Result<ChatTurn, LlmError> {
    let message = payload["choices"][0]
        .get("message")
        .ok_or_else(|| LlmError::Protocol("no choices in response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    Ok(ChatTurn {
        content,
        tool_calls,
    })
}

fn parse_tool_call(item: &Value) -> Option<ToolCallRequest> {
    let function = item.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    // Some servers omit the call id; an empty id is still answerable.
    let id = item
        .get("id")
        .and_then(|i| i.as_str())
        .unwrap_or_default()
        .to_string();
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or(Value::Null),
        Some(decoded) => decoded.clone(),
        None => Value::Null,
    };
    Some(ToolCallRequest {
        id,
        name,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_answer_turn() {
        let payload = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"sentiment\": \"Neutral\"}"}
            }]
        });
        let turn = parse_chat_turn(&payload).unwrap();
        assert!(turn.is_final());
        assert!(turn.content.contains("Neutral"));
    }

    #[test]
    fn test_parse_tool_call_turn_with_string_arguments() {
        let payload = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "classify_intent",
                            "arguments": "{\"transcript\": \"help with my loan\"}"
                        }
                    }]
                }
            }]
        });
        let turn = parse_chat_turn(&payload).unwrap();
        assert!(!turn.is_final());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "classify_intent");
        assert_eq!(
            turn.tool_calls[0].arguments["transcript"],
            json!("help with my loan")
        );
    }

    #[test]
    fn test_parse_tool_call_with_decoded_arguments() {
        // Some local servers send arguments as an object instead of a string.
        let payload = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {
                            "name": "analyze_sentiment",
                            "arguments": {"transcript": "thanks"}
                        }
                    }]
                }
            }]
        });
        let turn = parse_chat_turn(&payload).unwrap();
        assert_eq!(turn.tool_calls[0].arguments["transcript"], json!("thanks"));
        assert_eq!(turn.tool_calls[0].id, "");
    }

    #[test]
    fn test_missing_choices_is_protocol_error() {
        let err = parse_chat_turn(&json!({"error": "overloaded"})).unwrap_err();
        assert!(matches!(err, LlmError::Protocol(_)));
    }

    #[test]
    fn test_wire_message_for_tool_result() {
        let wire = to_wire_message(&ChatMessage::tool("call_1", "{\"intent\":\"x\"}"));
        assert_eq!(wire["role"], json!("tool"));
        assert_eq!(wire["tool_call_id"], json!("call_1"));
    }

    #[test]
    fn test_wire_message_encodes_tool_call_arguments_as_string() {
        let message = ChatMessage::assistant(
            "",
            vec![ToolCallRequest {
                id: "call_1".to_string(),
                name: "classify_intent".to_string(),
                arguments: json!({"transcript": "hi"}),
            }],
        );
        let wire = to_wire_message(&message);
        let arguments = wire["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert!(arguments.contains("transcript"));
    }
}
