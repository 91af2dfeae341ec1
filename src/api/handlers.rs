//! API request handlers

use axum::extract::multipart::{Field, Multipart, MultipartError};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::models::{non_empty, BurnSubtitlesBody, TranscribeBody, UploadForm};
use super::server::AppState;
use crate::error::{PipelineError, Result};
use crate::pipeline::{PipelineOutcome, PipelineRequest, UploadedVideo};
use crate::storage::paths;
use crate::workspace::{CleanupPolicy, TempWorkspace};

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Value {
    let pipeline = &state.pipeline;
    let transcoder = pipeline.transcoder().is_available().await;

    serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "transcoder": transcoder,
        "storage": pipeline.store().is_configured(),
        "transcription": pipeline.worker().is_configured(),
    })
}

/// Service name, version and routes
pub fn service_info() -> Value {
    serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "POST /upload-video": "multipart: video, userId",
            "POST /transcribe": "json: videoUrl, userId?, language?",
            "POST /process-video": "multipart: video, userId, language?",
            "POST /burn-subtitles": "json: videoUrl, segments | srtUrl, style?, format?, quality?, userId?, aspectRatio?",
            "GET /health": "service status",
        }
    })
}

/// Handle `POST /upload-video`
pub async fn upload_video(state: &AppState, multipart: Multipart) -> Result<PipelineOutcome> {
    let (workspace, form) = receive_upload(state, multipart).await?;
    run_upload(state, workspace, form.into_upload_request()).await
}

/// Handle `POST /process-video`
pub async fn process_video(state: &AppState, multipart: Multipart) -> Result<PipelineOutcome> {
    let (workspace, form) = receive_upload(state, multipart).await?;
    run_upload(state, workspace, form.into_process_request()).await
}

/// Handle `POST /transcribe`
pub async fn transcribe(state: &AppState, body: TranscribeBody) -> Result<PipelineOutcome> {
    state.pipeline.execute(body.into_request()?).await
}

/// Handle `POST /burn-subtitles`
pub async fn burn_subtitles(state: &AppState, body: BurnSubtitlesBody) -> Result<PipelineOutcome> {
    state.pipeline.execute(body.into_request()?).await
}

async fn run_upload(
    state: &AppState,
    workspace: TempWorkspace,
    request: Result<PipelineRequest>,
) -> Result<PipelineOutcome> {
    match request {
        Ok(request) => state.pipeline.run(workspace, request).await,
        Err(e) => {
            workspace.release(CleanupPolicy::Immediate);
            Err(e)
        }
    }
}

/// Stream the multipart body into a fresh workspace.
///
/// The video part is written to disk chunk by chunk; text parts are
/// collected into the form.
async fn receive_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(TempWorkspace, UploadForm)> {
    let mut workspace = state.pipeline.workspace()?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let video = save_video(&mut workspace, field).await?;
                info!(
                    "📥 Received upload {} ({:.2} MB)",
                    video.original_name,
                    video.size as f64 / (1024.0 * 1024.0)
                );
                form.video = Some(video);
            }
            "userId" => form.user_id = non_empty(Some(field.text().await.map_err(malformed)?)),
            "language" => form.language = non_empty(Some(field.text().await.map_err(malformed)?)),
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok((workspace, form))
}

async fn save_video(workspace: &mut TempWorkspace, mut field: Field<'_>) -> Result<UploadedVideo> {
    let original_name = field
        .file_name()
        .map(|name| paths::sanitize(name, "video.mp4"))
        .unwrap_or_else(|| "video.mp4".to_string());
    let content_type = field
        .content_type()
        .unwrap_or("video/mp4")
        .to_string();

    let path = workspace.artifact_path(&format!("upload-{}", original_name));
    let mut file = tokio::fs::File::create(&path).await?;
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(UploadedVideo {
        path,
        original_name,
        content_type,
        size,
    })
}

fn malformed(e: MultipartError) -> PipelineError {
    PipelineError::validation(format!("Malformed multipart body: {}", e))
}
