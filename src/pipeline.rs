//! Pipeline orchestration: sequences transcoding, transcription, subtitle
//! encoding and publication for each request kind, and owns the temp-file
//! lifecycle of every request.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::storage::{paths, ArtifactKind, ArtifactPublisher, ObjectStore, PublishedArtifact, SupabaseStore};
use crate::subtitles::{self, AspectRatio, StyleSpec, SubtitleFormat, SubtitleSegment, Word};
use crate::transcoder::{FfmpegTranscoder, Quality, Transcoder};
use crate::transcription::{AsrWorker, PollPolicy, RemoteTranscriber, RunPodWorker, TranscriptionOutput};
use crate::workspace::{CleanupPolicy, TempWorkspace};

const LANGUAGES: [&str; 3] = ["hinglish", "hindi", "english"];

/// A video received from the caller and already written into a workspace
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Where burn-in captions come from
#[derive(Debug, Clone)]
pub enum SubtitleSource {
    Segments(Vec<SubtitleSegment>),
    /// A preformatted subtitle file, burned as-is
    Url(String),
}

#[derive(Debug, Clone)]
pub struct BurnRequest {
    pub video_url: String,
    pub subtitles: SubtitleSource,
    pub style: Option<StyleSpec>,
    /// Explicit format; inferred from `style` when absent
    pub format: Option<SubtitleFormat>,
    pub quality: Quality,
    pub aspect_ratio: AspectRatio,
    pub user_id: Option<String>,
}

impl BurnRequest {
    /// Styled markup when asked for, or when a non-empty style is supplied;
    /// plain SRT otherwise
    pub fn resolved_format(&self) -> SubtitleFormat {
        match self.format {
            Some(format) => format,
            None if self.style.as_ref().is_some_and(|s| !s.is_empty()) => SubtitleFormat::Ass,
            None => SubtitleFormat::Srt,
        }
    }
}

/// One unit of work, selected by request shape
#[derive(Debug, Clone)]
pub enum PipelineRequest {
    UploadOnly {
        video: UploadedVideo,
        user_id: Option<String>,
    },
    TranscribeOnly {
        video_url: String,
        user_id: Option<String>,
        language: Option<String>,
    },
    FullPipeline {
        video: UploadedVideo,
        user_id: Option<String>,
        language: Option<String>,
    },
    BurnSubtitles(BurnRequest),
}

impl PipelineRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineRequest::UploadOnly { .. } => "upload",
            PipelineRequest::TranscribeOnly { .. } => "transcribe",
            PipelineRequest::FullPipeline { .. } => "process",
            PipelineRequest::BurnSubtitles(_) => "burn",
        }
    }

    /// Reject malformed input before any stage runs
    pub fn validate(&self) -> Result<()> {
        match self {
            PipelineRequest::UploadOnly { video, .. } => validate_upload(video),
            PipelineRequest::TranscribeOnly {
                video_url,
                language,
                ..
            } => {
                require_url(video_url, "videoUrl")?;
                validate_language(language.as_deref())
            }
            PipelineRequest::FullPipeline {
                video, language, ..
            } => {
                validate_upload(video)?;
                validate_language(language.as_deref())
            }
            PipelineRequest::BurnSubtitles(burn) => {
                require_url(&burn.video_url, "videoUrl")?;
                match &burn.subtitles {
                    SubtitleSource::Segments(segments) => {
                        if segments.is_empty() {
                            return Err(PipelineError::validation(
                                "segments or srtUrl is required",
                            ));
                        }
                        for (i, segment) in segments.iter().enumerate() {
                            segment.validate(i + 1)?;
                        }
                        Ok(())
                    }
                    SubtitleSource::Url(url) => {
                        require_url(url, "srtUrl")?;
                        if burn.resolved_format() == SubtitleFormat::Ass {
                            return Err(PipelineError::validation(
                                "segments are required for styled subtitles; srtUrl can only be burned as-is",
                            ));
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

fn validate_upload(video: &UploadedVideo) -> Result<()> {
    if video.size == 0 {
        return Err(PipelineError::validation("No video file provided"));
    }
    Ok(())
}

fn require_url(url: &str, field: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(PipelineError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_language(language: Option<&str>) -> Result<()> {
    match language {
        Some(lang) if !LANGUAGES.contains(&lang.to_ascii_lowercase().as_str()) => {
            Err(PipelineError::validation(format!(
                "Unsupported language '{}', expected one of: {}",
                lang,
                LANGUAGES.join(", ")
            )))
        }
        _ => Ok(()),
    }
}

/// Measured pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Download,
    ExtractAudio,
    PublishVideo,
    PublishAudio,
    Transcribe,
    EncodeSubtitles,
    PublishSubtitles,
    WriteSubtitles,
    BurnIn,
    PublishExport,
}

impl PipelineStage {
    fn label(&self) -> &'static str {
        match self {
            PipelineStage::Download => "⬇️ Downloading video",
            PipelineStage::ExtractAudio => "🎵 Extracting audio",
            PipelineStage::PublishVideo => "☁️ Uploading original video",
            PipelineStage::PublishAudio => "☁️ Uploading audio",
            PipelineStage::Transcribe => "🎤 Transcribing (may include a cold start)",
            PipelineStage::EncodeSubtitles => "📝 Encoding subtitles",
            PipelineStage::PublishSubtitles => "☁️ Uploading subtitles",
            PipelineStage::WriteSubtitles => "📝 Writing subtitle file",
            PipelineStage::BurnIn => "🔥 Burning subtitles",
            PipelineStage::PublishExport => "☁️ Uploading export",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: u64,
}

/// Records how long each stage of one request took
struct StageTimer {
    started: Instant,
    stages: Vec<StageTiming>,
}

impl StageTimer {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            stages: Vec::new(),
        }
    }

    async fn time<T, F>(&mut self, stage: PipelineStage, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        info!("{}...", stage.label());
        let started = Instant::now();
        let result = work.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.stages.push(StageTiming { stage, elapsed_ms });

        match &result {
            Ok(_) => info!("   └─ {:?} done in {}ms", stage, elapsed_ms),
            Err(e) => debug!("   └─ {:?} failed after {}ms: {}", stage, elapsed_ms, e),
        }
        result
    }

    fn total_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn finish(self) -> (u64, Vec<StageTiming>) {
        (self.total_ms(), self.stages)
    }
}

/// Storage paths of published artifacts, so callers can re-sign them later
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
}

/// Published subtitles plus the transcript they were built from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleBundle {
    /// Signed SRT URL
    pub srt: String,
    /// Signed WebVTT URL
    pub vtt: String,
    pub text: String,
    pub segments: Vec<SubtitleSegment>,
    pub words: Vec<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub video_url: String,
    pub storage_path: String,
    pub expires_in: u64,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeOutcome {
    pub segments: Vec<SubtitleSegment>,
    pub subtitles: SubtitleBundle,
    pub audio_url: String,
    pub storage_paths: StoragePaths,
    pub expires_in: u64,
    pub processing_time_ms: u64,
    pub stages: Vec<StageTiming>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetadata {
    pub original_filename: String,
    pub original_size: u64,
    pub segment_count: usize,
    pub word_count: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// `None` when only the non-critical video copy failed
    pub video_url: Option<String>,
    pub audio_url: String,
    pub subtitles: SubtitleBundle,
    pub metadata: ProcessMetadata,
    pub storage_paths: StoragePaths,
    pub signed_url_expires_in: u64,
    pub stages: Vec<StageTiming>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnOutcome {
    pub download_url: String,
    pub storage_path: String,
    pub format: SubtitleFormat,
    pub bitrate: String,
    pub expires_in: u64,
    pub processing_time_ms: u64,
    pub stages: Vec<StageTiming>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Upload(UploadOutcome),
    Transcribe(TranscribeOutcome),
    Process(ProcessOutcome),
    Burn(BurnOutcome),
}

/// Uniform result envelope: `{success, error?, errorKind?, ...outcome}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(flatten)]
    pub outcome: Option<PipelineOutcome>,
}

impl PipelineResponse {
    pub fn from_result(result: &Result<PipelineOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                error: None,
                error_kind: None,
                outcome: Some(outcome.clone()),
            },
            Err(e) => Self::failure(e),
        }
    }

    pub fn failure(error: &PipelineError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            outcome: None,
        }
    }
}

/// What transcription produced and where it was published
struct TranscriptArtifacts {
    audio: PublishedArtifact,
    srt: PublishedArtifact,
    vtt: PublishedArtifact,
    words: Option<PublishedArtifact>,
    output: TranscriptionOutput,
}

impl TranscriptArtifacts {
    fn bundle(&self) -> SubtitleBundle {
        SubtitleBundle {
            srt: self.srt.url.clone(),
            vtt: self.vtt.url.clone(),
            text: self.output.text.clone(),
            segments: self.output.segments.clone(),
            words: self.output.words.clone(),
            words_url: self.words.as_ref().map(|w| w.url.clone()),
        }
    }

    fn storage_paths(&self) -> StoragePaths {
        StoragePaths {
            audio: Some(self.audio.path.clone()),
            srt: Some(self.srt.path.clone()),
            vtt: Some(self.vtt.path.clone()),
            words: self.words.as_ref().map(|w| w.path.clone()),
            ..Default::default()
        }
    }
}

/// The captioning pipeline, built from explicit collaborator handles
pub struct Pipeline {
    transcoder: Arc<dyn Transcoder>,
    transcriber: RemoteTranscriber,
    publisher: ArtifactPublisher,
    temp_dir: PathBuf,
    request_timeout: Duration,
    cleanup_grace: Duration,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        transcoder: Arc<dyn Transcoder>,
        worker: Arc<dyn AsrWorker>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            transcoder,
            transcriber: RemoteTranscriber::new(worker, PollPolicy::from(&config.transcription)),
            publisher: ArtifactPublisher::new(store, &config.storage),
            temp_dir: config.pipeline.temp_dir.clone(),
            request_timeout: config.pipeline.request_timeout(),
            cleanup_grace: config.pipeline.cleanup_grace(),
        }
    }

    /// Wire up ffmpeg, RunPod and Supabase from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let transcoder = Arc::new(FfmpegTranscoder::new(&config.transcoder));
        let worker = Arc::new(RunPodWorker::new(&config.transcription)?);
        let store = Arc::new(SupabaseStore::new(&config.storage)?);
        Ok(Self::new(config, transcoder, worker, store))
    }

    pub fn transcoder(&self) -> &Arc<dyn Transcoder> {
        &self.transcoder
    }

    pub fn worker(&self) -> &Arc<dyn AsrWorker> {
        self.transcriber.worker()
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.publisher.store()
    }

    /// A fresh request-scoped workspace under the configured temp dir
    pub fn workspace(&self) -> Result<TempWorkspace> {
        TempWorkspace::create(&self.temp_dir)
    }

    /// Validate, allocate a workspace and run
    pub async fn execute(&self, request: PipelineRequest) -> Result<PipelineOutcome> {
        request.validate()?;
        let workspace = self.workspace()?;
        self.run(workspace, request).await
    }

    /// Run a request inside `workspace`, which is released on every exit:
    /// after the grace delay on success, immediately on failure.
    pub async fn run(
        &self,
        mut workspace: TempWorkspace,
        request: PipelineRequest,
    ) -> Result<PipelineOutcome> {
        let request_id = workspace.request_id().to_string();
        let kind = request.kind();
        let span = info_span!("request", id = %request_id, kind);

        let result = async {
            request.validate()?;
            info!("🚀 Starting {} request", kind);

            match tokio::time::timeout(self.request_timeout, self.dispatch(&mut workspace, request)).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::RequestTimeout(self.request_timeout)),
            }
        }
        .instrument(span)
        .await;

        match &result {
            Ok(_) => {
                info!("✅ Request {} ({}) completed", request_id, kind);
                workspace.release(CleanupPolicy::Deferred(self.cleanup_grace));
            }
            Err(e) => {
                error!("❌ Request {} ({}) failed: {}", request_id, kind, e);
                workspace.release(CleanupPolicy::Immediate);
            }
        }

        result
    }

    async fn dispatch(
        &self,
        workspace: &mut TempWorkspace,
        request: PipelineRequest,
    ) -> Result<PipelineOutcome> {
        match request {
            PipelineRequest::UploadOnly { video, user_id } => self
                .upload_only(workspace, video, user_id.as_deref())
                .await
                .map(PipelineOutcome::Upload),
            PipelineRequest::TranscribeOnly {
                video_url,
                user_id,
                language,
            } => self
                .transcribe_only(workspace, &video_url, user_id.as_deref(), language.as_deref())
                .await
                .map(PipelineOutcome::Transcribe),
            PipelineRequest::FullPipeline {
                video,
                user_id,
                language,
            } => self
                .full_pipeline(workspace, video, user_id.as_deref(), language.as_deref())
                .await
                .map(PipelineOutcome::Process),
            PipelineRequest::BurnSubtitles(burn) => self
                .burn_subtitles(workspace, burn)
                .await
                .map(PipelineOutcome::Burn),
        }
    }

    async fn upload_only(
        &self,
        workspace: &mut TempWorkspace,
        video: UploadedVideo,
        user_id: Option<&str>,
    ) -> Result<UploadOutcome> {
        let timer = StageTimer::start();
        workspace.register(video.path.clone());

        let bytes = tokio::fs::read(&video.path).await?;
        let path = paths::video(user_id, timestamp_ms(), &video.original_name);
        let published = self
            .publisher
            .publish(ArtifactKind::Video, path, bytes, &video.content_type)
            .await?;

        Ok(UploadOutcome {
            video_url: published.url,
            storage_path: published.path,
            expires_in: self.publisher.signed_url_ttl(),
            processing_time_ms: timer.total_ms(),
        })
    }

    async fn transcribe_only(
        &self,
        workspace: &mut TempWorkspace,
        video_url: &str,
        user_id: Option<&str>,
        language: Option<&str>,
    ) -> Result<TranscribeOutcome> {
        let mut timer = StageTimer::start();
        let ts = timestamp_ms();

        let video_path = workspace.artifact_path("source-video");
        timer
            .time(PipelineStage::Download, self.publisher.fetch(video_url, &video_path))
            .await?;

        let audio_path = self.extract_audio(workspace, &mut timer, &video_path).await?;
        let artifacts = self
            .transcribe_and_publish(&mut timer, &audio_path, user_id, ts, language)
            .await?;

        let (processing_time_ms, stages) = timer.finish();
        Ok(TranscribeOutcome {
            segments: artifacts.output.segments.clone(),
            subtitles: artifacts.bundle(),
            audio_url: artifacts.audio.url.clone(),
            storage_paths: artifacts.storage_paths(),
            expires_in: self.publisher.signed_url_ttl(),
            processing_time_ms,
            stages,
        })
    }

    async fn full_pipeline(
        &self,
        workspace: &mut TempWorkspace,
        video: UploadedVideo,
        user_id: Option<&str>,
        language: Option<&str>,
    ) -> Result<ProcessOutcome> {
        let mut timer = StageTimer::start();
        let ts = timestamp_ms();
        workspace.register(video.path.clone());

        let audio_path = self.extract_audio(workspace, &mut timer, &video.path).await?;

        // Only the video copy may fail without failing the request
        let video_copy = timer
            .time(PipelineStage::PublishVideo, async {
                let bytes = tokio::fs::read(&video.path).await?;
                let path = paths::video(user_id, ts, &video.original_name);
                self.publisher
                    .publish(ArtifactKind::Video, path, bytes, &video.content_type)
                    .await
            })
            .await;
        let video_copy = match video_copy {
            Ok(published) => Some(published),
            Err(e) => {
                warn!("⚠️ Video copy upload failed, continuing without videoUrl: {}", e);
                None
            }
        };

        let artifacts = self
            .transcribe_and_publish(&mut timer, &audio_path, user_id, ts, language)
            .await?;

        let mut storage_paths = artifacts.storage_paths();
        storage_paths.video = video_copy.as_ref().map(|v| v.path.clone());

        let (processing_time_ms, stages) = timer.finish();
        Ok(ProcessOutcome {
            video_url: video_copy.map(|v| v.url),
            audio_url: artifacts.audio.url.clone(),
            subtitles: artifacts.bundle(),
            metadata: ProcessMetadata {
                original_filename: video.original_name,
                original_size: video.size,
                segment_count: artifacts.output.segments.len(),
                word_count: artifacts.output.words.len(),
                processing_time_ms,
            },
            storage_paths,
            signed_url_expires_in: self.publisher.signed_url_ttl(),
            stages,
        })
    }

    async fn burn_subtitles(
        &self,
        workspace: &mut TempWorkspace,
        burn: BurnRequest,
    ) -> Result<BurnOutcome> {
        let mut timer = StageTimer::start();
        let format = burn.resolved_format();
        let bitrate = burn.quality.bitrate();
        debug!(
            "Burn-in: format={}, quality={}, aspect={}",
            format.extension(),
            burn.quality.as_str(),
            burn.aspect_ratio.as_str()
        );

        let video_path = workspace.artifact_path("source-video.mp4");
        timer
            .time(PipelineStage::Download, self.publisher.fetch(&burn.video_url, &video_path))
            .await?;

        let subtitle_path = workspace.artifact_path(&format!("captions.{}", format.extension()));
        timer
            .time(
                PipelineStage::WriteSubtitles,
                self.write_subtitles(&burn, format, &subtitle_path),
            )
            .await?;

        let rendered = timer
            .time(
                PipelineStage::BurnIn,
                self.transcoder.burn_subtitles(&video_path, &subtitle_path, bitrate),
            )
            .await?;
        workspace.register(rendered.clone());

        let published = timer
            .time(PipelineStage::PublishExport, async {
                let bytes = tokio::fs::read(&rendered).await?;
                let path = paths::export(burn.user_id.as_deref(), timestamp_ms());
                self.publisher
                    .publish(ArtifactKind::Export, path, bytes, "video/mp4")
                    .await
            })
            .await?;

        let (processing_time_ms, stages) = timer.finish();
        Ok(BurnOutcome {
            download_url: published.url,
            storage_path: published.path,
            format,
            bitrate: bitrate.to_string(),
            expires_in: self.publisher.export_url_ttl(),
            processing_time_ms,
            stages,
        })
    }

    /// Encode segments, or fetch and sanity-check a preformatted file
    async fn write_subtitles(
        &self,
        burn: &BurnRequest,
        format: SubtitleFormat,
        dest: &Path,
    ) -> Result<()> {
        match &burn.subtitles {
            SubtitleSource::Segments(segments) => {
                let content = match format {
                    SubtitleFormat::Srt => subtitles::srt::encode(segments),
                    SubtitleFormat::Vtt => subtitles::vtt::encode(segments),
                    SubtitleFormat::Ass => subtitles::ass::encode(
                        segments,
                        &burn.style.clone().unwrap_or_default(),
                        burn.aspect_ratio.canvas(),
                    ),
                };
                tokio::fs::write(dest, content).await?;
            }
            SubtitleSource::Url(url) => {
                self.publisher.store().download(url, dest).await?;
                let content = tokio::fs::read_to_string(dest).await?;
                let cues = match format {
                    SubtitleFormat::Vtt => subtitles::vtt::decode(&content)?,
                    _ => subtitles::srt::decode(&content)?,
                };
                if cues.is_empty() {
                    return Err(PipelineError::validation("subtitle file at srtUrl has no cues"));
                }
                debug!("Fetched subtitle file with {} cues", cues.len());
            }
        }
        Ok(())
    }

    async fn extract_audio(
        &self,
        workspace: &mut TempWorkspace,
        timer: &mut StageTimer,
        video: &Path,
    ) -> Result<PathBuf> {
        let audio_path = timer
            .time(PipelineStage::ExtractAudio, self.transcoder.extract_audio(video))
            .await?;
        workspace.register(audio_path.clone());
        Ok(audio_path)
    }

    /// Publish audio, transcribe it, then encode and publish SRT, WebVTT and
    /// word timings
    async fn transcribe_and_publish(
        &self,
        timer: &mut StageTimer,
        audio_path: &Path,
        user_id: Option<&str>,
        ts: i64,
        language: Option<&str>,
    ) -> Result<TranscriptArtifacts> {
        let audio_bytes = tokio::fs::read(audio_path).await?;

        let audio = timer
            .time(
                PipelineStage::PublishAudio,
                self.publisher.publish(
                    ArtifactKind::Audio,
                    paths::audio(user_id, ts),
                    audio_bytes.clone(),
                    "audio/wav",
                ),
            )
            .await?;

        let output = timer
            .time(
                PipelineStage::Transcribe,
                self.transcriber.transcribe(&audio_bytes, language),
            )
            .await?;

        let (srt, vtt) = timer
            .time(PipelineStage::EncodeSubtitles, async {
                Ok::<_, PipelineError>((
                    subtitles::srt::encode(&output.segments),
                    subtitles::vtt::encode(&output.segments),
                ))
            })
            .await?;

        let (srt, vtt, words) = timer
            .time(PipelineStage::PublishSubtitles, async {
                let (srt, vtt) = futures::try_join!(
                    self.publisher.publish(
                        ArtifactKind::Subtitles,
                        paths::subtitles(user_id, ts, "srt"),
                        srt.into_bytes(),
                        SubtitleFormat::Srt.content_type(),
                    ),
                    self.publisher.publish(
                        ArtifactKind::Subtitles,
                        paths::subtitles(user_id, ts, "vtt"),
                        vtt.into_bytes(),
                        SubtitleFormat::Vtt.content_type(),
                    ),
                )?;

                let words = if output.words.is_empty() {
                    None
                } else {
                    let json = serde_json::to_vec(&output.words)?;
                    Some(
                        self.publisher
                            .publish(
                                ArtifactKind::Subtitles,
                                paths::words(user_id, ts),
                                json,
                                "application/json",
                            )
                            .await?,
                    )
                };
                Ok::<_, PipelineError>((srt, vtt, words))
            })
            .await?;

        Ok(TranscriptArtifacts {
            audio,
            srt,
            vtt,
            words,
            output,
        })
    }
}

fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
