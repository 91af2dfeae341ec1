/// Caption Pipeline
///
/// Turns short-form videos into captioned videos: audio extraction, remote
/// transcription with job polling, SRT/WebVTT/ASS generation, burn-in through
/// ffmpeg and publication of every artifact to blob storage.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod subtitles;
pub mod transcoder;
pub mod transcription;
pub mod workspace;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{
    BurnRequest, Pipeline, PipelineOutcome, PipelineRequest, PipelineResponse, SubtitleSource,
    UploadedVideo,
};
pub use crate::storage::{ArtifactPublisher, ObjectStore, PublishedArtifact, SupabaseStore};
pub use crate::subtitles::{AspectRatio, StyleSpec, SubtitleFormat, SubtitleSegment, Word};
pub use crate::transcoder::{FfmpegTranscoder, Quality, Transcoder};
pub use crate::transcription::{
    AsrWorker, JobStatus, RemoteTranscriber, RunPodWorker, StatusReport, TranscriptionOutput,
};
pub use crate::workspace::{CleanupPolicy, TempWorkspace};
