use super::{cue_text, decode_cues, split_seconds, SubtitleSegment};
use crate::error::{PipelineError, Result};

const HEADER: &str = "WEBVTT";

/// Encode segments as a WebVTT document
pub fn encode(segments: &[SubtitleSegment]) -> String {
    let mut vtt_content = String::from(HEADER);
    vtt_content.push_str("\n\n");

    for segment in segments {
        vtt_content.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            cue_text(&segment.text)
        ));
    }

    vtt_content
}

/// Decode a WebVTT document, skipping the header and NOTE/STYLE/REGION blocks
pub fn decode(content: &str) -> Result<Vec<SubtitleSegment>> {
    let normalized = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n");

    let mut blocks = normalized.split("\n\n");
    let header = blocks.next().unwrap_or_default();
    if !header.starts_with(HEADER) {
        return Err(PipelineError::validation("WebVTT document must start with WEBVTT"));
    }

    let cues: Vec<&str> = blocks
        .filter(|block| {
            let first = block.trim_start();
            !(first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION"))
        })
        .collect();

    decode_cues(&cues.join("\n\n"), '.')
}

/// Format seconds as WebVTT timestamp (HH:MM:SS.mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let parts = split_seconds(seconds, 1000);
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        parts.hours, parts.minutes, parts.seconds, parts.fraction
    )
}
