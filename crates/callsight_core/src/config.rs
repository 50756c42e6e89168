//! Configuration for the callsight services.
//!
//! Loads settings from /etc/callsight/config.toml or uses defaults. Every
//! field has a default so a partial file is always valid.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/callsight/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/callsight/config.toml";

/// Reasoning backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL (Ollama: http://127.0.0.1:11434/v1)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key; unset for local backends
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Maximum tokens per model turn
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "http://127.0.0.1:11434/v1".to_string()
}

fn default_llm_model() -> String {
    "qwen3".to_string()
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_request_timeout() -> u64 {
    30
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: None,
            max_tokens: default_llm_max_tokens(),
            request_timeout_secs: default_llm_request_timeout(),
        }
    }
}

/// Orchestrator policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Maximum model turns before the loop gives up
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Single deadline over the whole reasoning state; expiry is treated
    /// like any other backend failure and routes to the fallback pipeline
    #[serde(default = "default_reasoning_timeout")]
    pub reasoning_timeout_secs: u64,

    /// When true, a schema-validation miss also routes through the
    /// deterministic fallback. Default false: the miss is reported inline as
    /// a degraded success and only backend/tool failures trigger fallback.
    #[serde(default)]
    pub fallback_on_validation_miss: bool,
}

fn default_max_turns() -> usize {
    8
}

fn default_reasoning_timeout() -> u64 {
    60
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            reasoning_timeout_secs: default_reasoning_timeout(),
            fallback_on_validation_miss: false,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    // Localhost only; put a reverse proxy in front for anything else
    "127.0.0.1:7430".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "/var/lib/callsight/calls.db".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Transcription server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeSettings {
    /// faster-whisper server base URL
    #[serde(default = "default_whisper_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds; transcription is slow
    #[serde(default = "default_whisper_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_whisper_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_whisper_request_timeout() -> u64 {
    120
}

impl Default for TranscribeSettings {
    fn default() -> Self {
        Self {
            base_url: default_whisper_base_url(),
            request_timeout_secs: default_whisper_request_timeout(),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallsightConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub transcribe: TranscribeSettings,
}

impl CallsightConfig {
    /// Load from the first existing config path, or defaults.
    pub fn load() -> Self {
        for path in [CONFIG_PATH, DEFAULT_CONFIG_PATH] {
            if Path::new(path).exists() {
                match Self::load_from(path) {
                    Ok(config) => {
                        info!("Loaded config from {}", path);
                        return config;
                    }
                    Err(e) => warn!("Ignoring unreadable config {}: {}", path, e),
                }
            }
        }
        info!("No config file found, using defaults");
        Self::default()
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
