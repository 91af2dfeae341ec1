//! Subtitle codec: segment lists to SRT, WebVTT and styled ASS markup.
//!
//! Everything in this module is a pure transformation; no I/O happens here.

pub mod ass;
pub mod srt;
pub mod style;
pub mod vtt;

pub use ass::{AspectRatio, Canvas};
pub use style::{Alignment, AssStyle, StyleSpec};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A caption's time span and text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

impl SubtitleSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check `0 <= start < end`; `position` is 1-based and only used in the message
    pub fn validate(&self, position: usize) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(PipelineError::validation(format!(
                "Segment {}: timestamps must be finite numbers",
                position
            )));
        }
        if self.start < 0.0 {
            return Err(PipelineError::validation(format!(
                "Segment {}: start must not be negative",
                position
            )));
        }
        if self.end <= self.start {
            return Err(PipelineError::validation(format!(
                "Segment {}: end ({}) must be after start ({})",
                position, self.end, self.start
            )));
        }
        Ok(())
    }
}

/// Word-level timing as returned by the ASR worker's forced alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Subtitle file formats the codec can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    /// Styled markup (Advanced SubStation Alpha)
    Ass,
}

impl SubtitleFormat {
    /// Parse a format name; anything unrecognised is plain SRT
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ass" | "ssa" => SubtitleFormat::Ass,
            "vtt" | "webvtt" => SubtitleFormat::Vtt,
            _ => SubtitleFormat::Srt,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "text/plain",
            SubtitleFormat::Vtt => "text/vtt",
            SubtitleFormat::Ass => "text/x-ssa",
        }
    }
}

impl From<String> for SubtitleFormat {
    fn from(name: String) -> Self {
        SubtitleFormat::from_name(&name)
    }
}

impl From<SubtitleFormat> for String {
    fn from(format: SubtitleFormat) -> Self {
        format.extension().to_string()
    }
}

/// Caption text as written into a cue: trimmed, with blank lines removed so
/// the text can never terminate its cue early
pub(crate) fn cue_text(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wall-clock components of a timestamp at a given sub-second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClockParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    /// Sub-second units (milliseconds or centiseconds)
    pub fraction: u64,
}

/// Split `seconds` into clock parts, flooring to `units_per_second`.
///
/// Flooring keeps a segment's end from being rounded past the next segment's
/// start. The small bias absorbs binary representation error so that values
/// such as `1.001` still floor to 1001 ms.
pub(crate) fn split_seconds(seconds: f64, units_per_second: u64) -> ClockParts {
    let scaled = seconds.max(0.0) * units_per_second as f64 + 1e-6;
    let total_units = scaled.floor() as u64;
    let total_seconds = total_units / units_per_second;

    ClockParts {
        hours: total_seconds / 3600,
        minutes: (total_seconds % 3600) / 60,
        seconds: total_seconds % 60,
        fraction: total_units % units_per_second,
    }
}

/// Parse `[HH:]MM:SS<sep>mmm` into seconds
pub(crate) fn parse_clock(timestamp: &str, millis_separator: char) -> Option<f64> {
    let (clock, millis) = timestamp.trim().rsplit_once(millis_separator)?;
    if millis.len() != 3 {
        return None;
    }
    let millis: u64 = millis.parse().ok()?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        _ => return None,
    };
    if minutes > 59 || seconds > 59 {
        return None;
    }

    let whole = hours * 3600 + minutes * 60 + seconds;
    Some(whole as f64 + millis as f64 / 1000.0)
}

/// Decode blank-line separated cues shared by SRT and WebVTT.
///
/// Each block is an optional identifier line, a `start --> end` timing line
/// (cue settings after the end timestamp are ignored) and one or more text
/// lines.
pub(crate) fn decode_cues(body: &str, millis_separator: char) -> Result<Vec<SubtitleSegment>> {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let mut segments = Vec::new();

    for (block_index, block) in normalized.split("\n\n").enumerate() {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            continue;
        }

        let timing_pos = lines
            .iter()
            .position(|l| l.contains("-->"))
            .ok_or_else(|| {
                PipelineError::validation(format!("Cue {}: missing timing line", block_index + 1))
            })?;
        if timing_pos > 1 {
            return Err(PipelineError::validation(format!(
                "Cue {}: unexpected text before timing line",
                block_index + 1
            )));
        }

        let (start_raw, end_raw) = lines[timing_pos]
            .split_once("-->")
            .unwrap_or_default();
        let end_raw = end_raw.split_whitespace().next().unwrap_or_default();

        let start = parse_clock(start_raw, millis_separator);
        let end = parse_clock(end_raw, millis_separator);
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(PipelineError::validation(format!(
                    "Cue {}: invalid timestamp in '{}'",
                    block_index + 1,
                    lines[timing_pos]
                )))
            }
        };

        segments.push(SubtitleSegment {
            start,
            end,
            text: lines[timing_pos + 1..].join("\n"),
        });
    }

    Ok(segments)
}
