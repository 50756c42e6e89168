//! Boundary errors for the analysis engine.
//!
//! These are the only failures a caller ever sees. Everything else (backend
//! outages, tool failures, schema misses, storage trouble) degrades to the
//! fallback pipeline or to an inline `validation_error` instead of failing
//! the run.

/// Caller-visible analysis failure.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Neither a transcript nor an audio reference was supplied.
    #[error("neither a transcript nor an audio reference was supplied")]
    MissingInput,

    /// An audio reference was supplied but does not resolve.
    #[error("audio reference not found: {0}")]
    AudioNotFound(String),
}
