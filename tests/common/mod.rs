//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use caption_pipeline::transcoder::{audio_output_path, burn_output_path};
use caption_pipeline::{
    AsrWorker, Config, ConfigBuilder, JobStatus, ObjectStore, Pipeline, PipelineError, Result,
    StatusReport, SubtitleSegment, Transcoder, TranscriptionOutput, Word,
};

pub const SAMPLE_SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nhello\n\n2\n00:00:02,000 --> 00:00:04,000\nworld\n\n";

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub bucket: String,
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

/// Records uploads; can be told to reject one bucket
#[derive(Default)]
pub struct FakeStore {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub downloads: Mutex<Vec<String>>,
    pub failing_bucket: Option<String>,
}

impl FakeStore {
    pub fn failing(bucket: &str) -> Self {
        Self {
            failing_bucket: Some(bucket.to_string()),
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn uploads_in(&self, bucket: &str) -> Vec<RecordedUpload> {
        self.uploads()
            .into_iter()
            .filter(|u| u.bucket == bucket)
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        if self.failing_bucket.as_deref() == Some(bucket) {
            return Err(PipelineError::Storage(format!("bucket {} unavailable", bucket)));
        }
        self.uploads.lock().unwrap().push(RecordedUpload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String> {
        Ok(format!("https://storage.test/sign/{}/{}?ttl={}", bucket, path, ttl_secs))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.lock().unwrap().push(url.to_string());
        let body: Vec<u8> = if url.ends_with(".srt") {
            SAMPLE_SRT.as_bytes().to_vec()
        } else {
            vec![0u8; 4096]
        };
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

/// Writes placeholder outputs next to its inputs, like ffmpeg would
#[derive(Default)]
pub struct FakeTranscoder {
    pub fail_burn: bool,
    pub bitrates: Mutex<Vec<String>>,
    pub burned_subtitles: Mutex<Vec<String>>,
}

impl FakeTranscoder {
    pub fn failing_burn() -> Self {
        Self {
            fail_burn: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf> {
        let output = audio_output_path(video);
        tokio::fs::write(&output, vec![1u8; 2048]).await?;
        Ok(output)
    }

    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, bitrate: &str) -> Result<PathBuf> {
        self.bitrates.lock().unwrap().push(bitrate.to_string());
        let content = tokio::fs::read_to_string(subtitles).await?;
        self.burned_subtitles.lock().unwrap().push(content);

        if self.fail_burn {
            return Err(PipelineError::Transcoder("ffmpeg exited with status 1".to_string()));
        }
        let output = burn_output_path(video);
        tokio::fs::write(&output, vec![2u8; 8192]).await?;
        Ok(output)
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Replays a fixed sequence of statuses, repeating the last one
pub struct ScriptedWorker {
    job_id: Option<String>,
    script: Mutex<VecDeque<StatusReport>>,
    pub status_calls: AtomicUsize,
}

impl ScriptedWorker {
    pub fn new(job_id: Option<&str>, script: Vec<StatusReport>) -> Self {
        Self {
            job_id: job_id.map(str::to_string),
            script: Mutex::new(script.into()),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Two queue checks, then a completed transcript with word timings
    pub fn completing() -> Self {
        let mut done = StatusReport::new(JobStatus::Completed);
        done.output = Some(sample_transcript());
        Self::new(
            Some("job-1"),
            vec![
                StatusReport::new(JobStatus::InQueue),
                StatusReport::new(JobStatus::InProgress),
                done,
            ],
        )
    }

    /// Never leaves IN_PROGRESS
    pub fn stuck() -> Self {
        Self::new(Some("job-3"), vec![StatusReport::new(JobStatus::InProgress)])
    }

    pub fn failing(detail: &str) -> Self {
        let mut failed = StatusReport::new(JobStatus::Failed);
        failed.detail = Some(detail.to_string());
        Self::new(Some("job-2"), vec![failed])
    }

    pub fn calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsrWorker for ScriptedWorker {
    async fn submit(&self, _audio_base64: &str, _language: Option<&str>) -> Result<Option<String>> {
        Ok(self.job_id.clone())
    }

    async fn status(&self, _job_id: &str) -> Result<StatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.pop_front().unwrap())
        } else {
            Ok(script.front().cloned().unwrap_or_else(|| StatusReport::new(JobStatus::InProgress)))
        }
    }
}

pub fn sample_transcript() -> TranscriptionOutput {
    TranscriptionOutput {
        text: "namaste dosto".to_string(),
        segments: vec![
            SubtitleSegment::new(0.0, 1.2, "namaste"),
            SubtitleSegment::new(1.2, 2.5, "dosto"),
        ],
        words: vec![
            Word {
                start: 0.0,
                end: 1.2,
                text: "namaste".to_string(),
            },
            Word {
                start: 1.2,
                end: 2.5,
                text: "dosto".to_string(),
            },
        ],
    }
}

pub fn test_config(temp_dir: &Path) -> Config {
    ConfigBuilder::new()
        .with_temp_dir(temp_dir.to_path_buf())
        .with_poll(Duration::from_millis(1), 100)
        .with_request_timeout(Duration::from_secs(30))
        .with_cleanup_grace(Duration::from_millis(10))
        .build()
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub store: Arc<FakeStore>,
    pub transcoder: Arc<FakeTranscoder>,
    pub worker: Arc<ScriptedWorker>,
    pub temp_dir: PathBuf,
    _root: tempfile::TempDir,
}

impl Harness {
    pub fn new(store: FakeStore, transcoder: FakeTranscoder, worker: ScriptedWorker) -> Self {
        Self::with_config(test_config, store, transcoder, worker)
    }

    /// Build with a config derived from the harness temp dir
    pub fn with_config(
        config: impl FnOnce(&Path) -> Config,
        store: FakeStore,
        transcoder: FakeTranscoder,
        worker: ScriptedWorker,
    ) -> Self {
        let root = tempfile::tempdir().unwrap();
        let temp_dir = root.path().join("work");
        let store = Arc::new(store);
        let transcoder = Arc::new(transcoder);
        let worker = Arc::new(worker);
        let pipeline = Pipeline::new(
            &config(&temp_dir),
            transcoder.clone(),
            worker.clone(),
            store.clone(),
        );

        Self {
            pipeline,
            store,
            transcoder,
            worker,
            temp_dir,
            _root: root,
        }
    }

    pub fn default_collaborators() -> Self {
        Self::new(
            FakeStore::default(),
            FakeTranscoder::default(),
            ScriptedWorker::completing(),
        )
    }

    /// Number of request workspaces still on disk
    pub fn live_workspaces(&self) -> usize {
        match std::fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}
