//! Audio transcription collaborator.
//!
//! Transcription is an external capability behind a trait. The production
//! adapter posts the audio to a faster-whisper style HTTP server; tests use
//! the fixture transcriber from [`crate::testing`].

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// A finished transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub duration_secs: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("audio reference not found: {0}")]
    NotFound(String),

    #[error("transcription backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Check that a reference resolves, without transcribing it.
    async fn probe(&self, reference: &str) -> Result<(), TranscribeError>;

    /// Transcribe the referenced audio.
    async fn transcribe(&self, reference: &str) -> Result<Transcription, TranscribeError>;
}

/// HTTP adapter for a faster-whisper transcription server.
pub struct HttpWhisperTranscriber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWhisperTranscriber {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, TranscribeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranscribeError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Transcriber for HttpWhisperTranscriber {
    async fn probe(&self, reference: &str) -> Result<(), TranscribeError> {
        if tokio::fs::try_exists(reference).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(TranscribeError::NotFound(reference.to_string()))
        }
    }

    async fn transcribe(&self, reference: &str) -> Result<Transcription, TranscribeError> {
        self.probe(reference).await?;

        let bytes = tokio::fs::read(reference)
            .await
            .map_err(|e| TranscribeError::Backend(format!("failed to read {reference}: {e}")))?;
        let file_name = Path::new(reference)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::Backend(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TranscribeError::Backend(format!(
                "transcription server returned HTTP {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranscribeError::Backend(format!("invalid response: {e}")))?;

        let text = payload
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();
        let duration_secs = payload
            .get("duration")
            .and_then(|d| d.as_f64())
            .unwrap_or(0.0);

        Ok(Transcription {
            text,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_missing_file_is_not_found() {
        let transcriber = HttpWhisperTranscriber::new("http://127.0.0.1:9", 1).unwrap();
        let err = transcriber.probe("/definitely/not/here.wav").await.unwrap_err();
        assert!(matches!(err, TranscribeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_probe_existing_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        std::fs::write(&path, b"riff").unwrap();

        let transcriber = HttpWhisperTranscriber::new("http://127.0.0.1:9", 1).unwrap();
        assert!(transcriber.probe(path.to_str().unwrap()).await.is_ok());
    }
}
