//! API request bodies and their mapping onto pipeline requests

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::pipeline::{BurnRequest, PipelineRequest, SubtitleSource, UploadedVideo};
use crate::subtitles::{AspectRatio, StyleSpec, SubtitleFormat, SubtitleSegment};
use crate::transcoder::Quality;

/// `POST /transcribe`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeBody {
    pub video_url: Option<String>,
    pub user_id: Option<String>,
    pub language: Option<String>,
}

impl TranscribeBody {
    pub fn into_request(self) -> Result<PipelineRequest> {
        let video_url = required(self.video_url, "videoUrl")?;
        Ok(PipelineRequest::TranscribeOnly {
            video_url,
            user_id: non_empty(self.user_id),
            language: non_empty(self.language),
        })
    }
}

/// `POST /burn-subtitles`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnSubtitlesBody {
    pub video_url: Option<String>,
    pub segments: Option<Vec<SubtitleSegment>>,
    pub srt_url: Option<String>,
    pub style: Option<StyleSpec>,
    pub format: Option<SubtitleFormat>,
    pub quality: Option<Quality>,
    pub user_id: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
}

impl BurnSubtitlesBody {
    /// Segments take precedence over `srtUrl` when both are sent
    pub fn into_request(self) -> Result<PipelineRequest> {
        let video_url = required(self.video_url, "videoUrl")?;

        let subtitles = match (self.segments, non_empty(self.srt_url)) {
            (Some(segments), _) if !segments.is_empty() => SubtitleSource::Segments(segments),
            (_, Some(url)) => SubtitleSource::Url(url),
            _ => return Err(PipelineError::validation("segments or srtUrl is required")),
        };

        Ok(PipelineRequest::BurnSubtitles(BurnRequest {
            video_url,
            subtitles,
            style: self.style,
            format: self.format,
            quality: self.quality.unwrap_or_default(),
            aspect_ratio: self.aspect_ratio.unwrap_or_default(),
            user_id: non_empty(self.user_id),
        }))
    }
}

/// Fields collected from a multipart upload
#[derive(Debug, Default)]
pub struct UploadForm {
    pub video: Option<UploadedVideo>,
    pub user_id: Option<String>,
    pub language: Option<String>,
}

impl UploadForm {
    pub fn into_upload_request(self) -> Result<PipelineRequest> {
        Ok(PipelineRequest::UploadOnly {
            video: self.require_video()?,
            user_id: self.user_id,
        })
    }

    pub fn into_process_request(self) -> Result<PipelineRequest> {
        Ok(PipelineRequest::FullPipeline {
            video: self.require_video()?,
            user_id: self.user_id,
            language: self.language,
        })
    }

    fn require_video(&self) -> Result<UploadedVideo> {
        self.video
            .clone()
            .ok_or_else(|| PipelineError::validation("No video file provided"))
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| PipelineError::validation(format!("{} is required", field)))
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
