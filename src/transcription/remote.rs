use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, info, warn};

use super::{AsrWorker, JobStatus, TranscriptionJob, TranscriptionOutput};
use crate::config::TranscriptionConfig;
use crate::error::{PipelineError, Result};

/// Poll cadence for job status checks
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Sleep before each status check
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time a job can be polled before giving up
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), 100)
    }
}

impl From<&TranscriptionConfig> for PollPolicy {
    fn from(config: &TranscriptionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.max_poll_attempts,
        )
    }
}

/// Submit-then-poll client, synchronous from the caller's point of view
pub struct RemoteTranscriber {
    worker: Arc<dyn AsrWorker>,
    policy: PollPolicy,
}

impl RemoteTranscriber {
    pub fn new(worker: Arc<dyn AsrWorker>, policy: PollPolicy) -> Self {
        Self { worker, policy }
    }

    pub fn worker(&self) -> &Arc<dyn AsrWorker> {
        &self.worker
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Transcribe raw audio bytes.
    ///
    /// Every call creates a new remote job. A job that never reaches a
    /// terminal state within the poll cap fails with `UpstreamTimeout`,
    /// never `UpstreamFailure`.
    pub async fn transcribe(
        &self,
        audio: &[u8],
        language: Option<&str>,
    ) -> Result<TranscriptionOutput> {
        let audio_base64 = general_purpose::STANDARD.encode(audio);
        debug!(
            "Encoded {} bytes of audio ({} base64 chars)",
            audio.len(),
            audio_base64.len()
        );

        let job_id = self
            .worker
            .submit(&audio_base64, language)
            .await?
            .filter(|id| !id.is_empty())
            .ok_or(PipelineError::NoJobId)?;

        info!("📤 Transcription job submitted: {}", job_id);
        let mut job = TranscriptionJob::submitted(job_id);
        let started = Instant::now();

        while job.attempts < self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            let report = self.worker.status(&job.id).await?;
            if job.observe(report.status, &report.raw_status) {
                info!(
                    "⏳ [{}s] Job {}: {} {}",
                    started.elapsed().as_secs(),
                    job.id,
                    report.raw_status,
                    report.status.hint()
                );
            }

            match report.status {
                JobStatus::Completed => {
                    let output = report.output.ok_or_else(|| PipelineError::UpstreamFailure {
                        job_id: job.id.clone(),
                        detail: "job completed without output".to_string(),
                    })?;
                    info!(
                        "✅ Transcription finished in {:.1}s: {} segments, {} words",
                        started.elapsed().as_secs_f64(),
                        output.segments.len(),
                        output.words.len()
                    );
                    return Ok(output);
                }
                JobStatus::Failed => {
                    return Err(PipelineError::UpstreamFailure {
                        job_id: job.id,
                        detail: report.detail.unwrap_or(report.raw_status),
                    });
                }
                _ => {}
            }
        }

        job.time_out();
        warn!(
            "Transcription job {} still not finished after {} status checks",
            job.id, job.attempts
        );
        Err(PipelineError::UpstreamTimeout {
            job_id: job.id,
            attempts: job.attempts,
        })
    }
}
