//! Error taxonomy for the captioning pipeline

use std::time::Duration;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Missing or malformed request input; no stage has run
    #[error("{0}")]
    Validation(String),

    /// The ASR worker rejected the submission
    #[error("Transcription submit failed: {0}")]
    UpstreamSubmit(String),

    /// The ASR worker accepted the request but returned no job identifier
    #[error("No job ID returned from transcription worker")]
    NoJobId,

    /// The job reached the worker's terminal failure state
    #[error("Transcription job {job_id} failed: {detail}")]
    UpstreamFailure { job_id: String, detail: String },

    /// The poll cap was exhausted without a terminal state
    #[error("Transcription job {job_id} timed out after {attempts} status checks")]
    UpstreamTimeout { job_id: String, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcoder error: {0}")]
    Transcoder(String),

    #[error("Request did not complete within {0:?}")]
    RequestTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable tag exposed to callers as `errorKind`
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::UpstreamSubmit(_) | PipelineError::NoJobId => "upstream_submit",
            PipelineError::UpstreamFailure { .. } => "upstream_failure",
            PipelineError::UpstreamTimeout { .. } => "upstream_timeout",
            PipelineError::Storage(_) => "storage",
            PipelineError::Transcoder(_) => "transcoder",
            PipelineError::RequestTimeout(_) => "request_timeout",
            PipelineError::Config(_) => "config",
            PipelineError::Io(_) => "io",
            PipelineError::Http(_) => "http",
            PipelineError::Json(_) => "json",
        }
    }

    /// Whether a later retry of the same input may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamTimeout { .. }
                | PipelineError::RequestTimeout(_)
                | PipelineError::Http(_)
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        PipelineError::Storage(message.into())
    }
}
