//! Transcoder invocation: audio extraction and subtitle burn-in through ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TranscoderConfig;
use crate::error::{PipelineError, Result};

/// Lines of ffmpeg stderr kept in error messages
const STDERR_TAIL_LINES: usize = 12;

/// Burn-in quality preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Quality {
    Fast,
    #[default]
    Balanced,
    High,
}

impl Quality {
    /// Parse a preset name; unknown names fall back to `Balanced`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fast" => Quality::Fast,
            "high" => Quality::High,
            _ => Quality::Balanced,
        }
    }

    /// Video bitrate passed to `-b:v`
    pub fn bitrate(&self) -> &'static str {
        match self {
            Quality::Fast => "2M",
            Quality::Balanced => "4M",
            Quality::High => "8M",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Fast => "fast",
            Quality::Balanced => "balanced",
            Quality::High => "high",
        }
    }
}

impl From<String> for Quality {
    fn from(name: String) -> Self {
        Quality::from_name(&name)
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.as_str().to_string()
    }
}

/// External video transcoder
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Strip video and write mono 16-bit PCM WAV; returns the new file's path
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf>;

    /// Overlay a subtitle file onto the video, re-encoding video at `bitrate`
    /// and copying the audio stream
    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, bitrate: &str) -> Result<PathBuf>;

    /// Whether the transcoder binary can be executed
    async fn is_available(&self) -> bool;
}

/// `Transcoder` backed by the ffmpeg command line
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    sample_rate: u32,
    fonts_dir: Option<PathBuf>,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscoderConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            sample_rate: config.sample_rate,
            fonts_dir: config.fonts_dir.clone(),
        }
    }

    async fn run(&self, args: Vec<String>, operation: &str) -> Result<()> {
        debug!("{} {}", self.ffmpeg_path.display(), args.join(" "));

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Transcoder(format!(
                    "failed to start {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Transcoder(format!(
                "{} failed ({}): {}",
                operation,
                output.status,
                stderr_tail(&stderr)
            )));
        }

        Ok(())
    }

    fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref().filter(|dir| dir.is_dir())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, video: &Path) -> Result<PathBuf> {
        let audio_path = audio_output_path(video);
        info!("🎵 Extracting audio: {}", video.display());

        let args = vec![
            "-i".to_string(),
            video.display().to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-y".to_string(),
            audio_path.display().to_string(),
        ];
        self.run(args, "audio extraction").await?;

        info!("✅ Audio extracted: {}", audio_path.display());
        Ok(audio_path)
    }

    async fn burn_subtitles(&self, video: &Path, subtitles: &Path, bitrate: &str) -> Result<PathBuf> {
        let output_path = burn_output_path(video);
        let filter = subtitles_filter(subtitles, self.fonts_dir());
        info!("🔥 Burning subtitles into {} at {}", video.display(), bitrate);

        let args = vec![
            "-i".to_string(),
            video.display().to_string(),
            "-vf".to_string(),
            filter,
            "-b:v".to_string(),
            bitrate.to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output_path.display().to_string(),
        ];
        self.run(args, "subtitle burn-in").await?;

        info!("✅ Burn-in complete: {}", output_path.display());
        Ok(output_path)
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// `<video>_audio.wav`, next to the input and never equal to it
pub fn audio_output_path(video: &Path) -> PathBuf {
    let mut name = video.as_os_str().to_os_string();
    name.push("_audio.wav");
    PathBuf::from(name)
}

/// `<stem>-output.mp4` next to the input
pub fn burn_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{}-output.mp4", stem))
}

/// Escape a path for use inside a single-quoted filter-graph option value
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

/// Build the `subtitles=` video filter expression
pub fn subtitles_filter(subtitles: &Path, fonts_dir: Option<&Path>) -> String {
    let mut filter = format!("subtitles='{}'", escape_filter_path(subtitles));
    if let Some(dir) = fonts_dir {
        filter.push_str(&format!(":fontsdir='{}'", escape_filter_path(dir)));
    }
    filter
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quality_bitrates() {
        assert_eq!(Quality::from_name("fast").bitrate(), "2M");
        assert_eq!(Quality::from_name("balanced").bitrate(), "4M");
        assert_eq!(Quality::from_name("HIGH").bitrate(), "8M");
        assert_eq!(Quality::from_name("ultra").bitrate(), "4M");
        assert_eq!(Quality::default().bitrate(), "4M");
    }

    #[test]
    fn test_audio_path_differs_from_extensionless_input() {
        let video = Path::new("/tmp/req-1/upload");
        let audio = audio_output_path(video);

        assert_ne!(audio, video);
        assert_eq!(audio, Path::new("/tmp/req-1/upload_audio.wav"));
        assert_eq!(
            audio_output_path(Path::new("/tmp/clip.mp4")),
            Path::new("/tmp/clip.mp4_audio.wav")
        );
    }

    #[test]
    fn test_burn_output_path() {
        assert_eq!(
            burn_output_path(Path::new("/tmp/req-1/input.mov")),
            Path::new("/tmp/req-1/input-output.mp4")
        );
    }

    #[test]
    fn test_filter_path_escaping() {
        let path = Path::new("/tmp/it's: here/subs.ass");
        assert_eq!(escape_filter_path(path), "/tmp/it'\\''s\\: here/subs.ass");
        assert_eq!(
            escape_filter_path(Path::new("C:\\work\\subs.srt")),
            "C\\:/work/subs.srt"
        );
    }

    #[test]
    fn test_subtitles_filter_with_fonts_dir() {
        assert_eq!(
            subtitles_filter(Path::new("/tmp/a.srt"), None),
            "subtitles='/tmp/a.srt'"
        );
        assert_eq!(
            subtitles_filter(Path::new("/tmp/a.ass"), Some(Path::new("/opt/fonts"))),
            "subtitles='/tmp/a.ass':fontsdir='/opt/fonts'"
        );
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&stderr);

        assert!(tail.starts_with("line 18"));
        assert!(tail.ends_with("line 29"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_run_kills_ffmpeg() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let fake = dir.path().join("slow-ffmpeg");
        std::fs::write(
            &fake,
            format!("#!/bin/sh\nsleep 1\ntouch '{}'\n", marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder {
            ffmpeg_path: fake,
            sample_rate: 16000,
            fonts_dir: None,
        };
        let video = dir.path().join("in.mp4");
        let abandoned =
            tokio::time::timeout(Duration::from_millis(200), transcoder.extract_audio(&video)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_transcoder_error() {
        let transcoder = FfmpegTranscoder {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-binary"),
            sample_rate: 16000,
            fonts_dir: None,
        };

        assert!(!transcoder.is_available().await);
        let err = transcoder
            .extract_audio(Path::new("/tmp/missing.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transcoder");
    }
}
