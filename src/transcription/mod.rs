//! Remote transcription: submit audio to an ASR worker and poll until the
//! job reaches a terminal state.

pub mod job;
pub mod remote;
pub mod runpod;

pub use job::{JobStatus, TranscriptionJob};
pub use remote::{PollPolicy, RemoteTranscriber};
pub use runpod::RunPodWorker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::subtitles::{SubtitleSegment, Word};

/// Transcript produced by a completed job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<SubtitleSegment>,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// One status check against the worker
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: JobStatus,
    /// Status string exactly as the worker sent it
    pub raw_status: String,
    pub output: Option<TranscriptionOutput>,
    /// Worker-provided failure detail
    pub detail: Option<String>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            raw_status: status.as_str().to_string(),
            output: None,
            detail: None,
        }
    }
}

/// A remote ASR worker that runs transcription jobs asynchronously
#[async_trait]
pub trait AsrWorker: Send + Sync {
    /// Submit base64 audio; `Ok(None)` means the worker accepted the request
    /// but returned no job id
    async fn submit(&self, audio_base64: &str, language: Option<&str>) -> Result<Option<String>>;

    async fn status(&self, job_id: &str) -> Result<StatusReport>;

    /// Whether credentials and endpoint are present
    fn is_configured(&self) -> bool {
        true
    }
}
