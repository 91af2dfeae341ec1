//! Styled subtitle markup (Advanced SubStation Alpha v4+).

use serde::{Deserialize, Serialize};

use super::style::{AssStyle, StyleSpec};
use super::{cue_text, split_seconds, SubtitleSegment};

const SCRIPT_TITLE: &str = "Caption Export";
const LINE_ENDING: &str = "\r\n";

const STYLES_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENTS_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Output frame shape requested for a burn-in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AspectRatio {
    /// 9:16, vertical short-form video
    #[default]
    Portrait,
    /// 16:9
    Landscape,
    /// 1:1, also used for unrecognised ratios
    Square,
}

impl AspectRatio {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "9:16" => AspectRatio::Portrait,
            "16:9" => AspectRatio::Landscape,
            _ => AspectRatio::Square,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }

    /// Script resolution the markup is authored against
    pub fn canvas(&self) -> Canvas {
        match self {
            AspectRatio::Portrait => Canvas {
                width: 1080,
                height: 1920,
            },
            AspectRatio::Landscape => Canvas {
                width: 1920,
                height: 1080,
            },
            AspectRatio::Square => Canvas {
                width: 1080,
                height: 1080,
            },
        }
    }
}

impl From<String> for AspectRatio {
    fn from(name: String) -> Self {
        AspectRatio::from_name(&name)
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.as_str().to_string()
    }
}

/// `PlayResX` x `PlayResY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Encode segments as a complete ASS script with a single `Default` style
pub fn encode(segments: &[SubtitleSegment], spec: &StyleSpec, canvas: Canvas) -> String {
    let style = AssStyle::from_spec(spec, canvas);
    let title = format!("Title: {}", SCRIPT_TITLE);
    let play_res_x = format!("PlayResX: {}", canvas.width);
    let play_res_y = format!("PlayResY: {}", canvas.height);
    let style_line = style.style_line();

    let header: [&str; 12] = [
        "[Script Info]",
        &title,
        "ScriptType: v4.00+",
        &play_res_x,
        &play_res_y,
        "",
        "[V4+ Styles]",
        STYLES_FORMAT,
        &style_line,
        "",
        "[Events]",
        EVENTS_FORMAT,
    ];

    let mut lines: Vec<String> = header.iter().map(|l| l.to_string()).collect();
    lines.extend(
        segments
            .iter()
            .map(|segment| dialogue_line(segment, spec.all_caps())),
    );

    let mut script = lines.join(LINE_ENDING);
    script.push_str(LINE_ENDING);
    script
}

fn dialogue_line(segment: &SubtitleSegment, all_caps: bool) -> String {
    format!(
        "Dialogue: 0,{},{},Default,,0,0,0,,{}",
        format_timestamp(segment.start),
        format_timestamp(segment.end),
        escape_text(&segment.text, all_caps)
    )
}

/// Dialogue text is a single record: newlines become `\N`
fn escape_text(text: &str, all_caps: bool) -> String {
    let text = cue_text(text);
    let text = if all_caps { text.to_uppercase() } else { text };

    text.replace('\r', "").replace('\n', "\\N")
}

/// Format seconds as ASS timestamp (H:MM:SS.cc)
pub fn format_timestamp(seconds: f64) -> String {
    let parts = split_seconds(seconds, 100);
    format!(
        "{}:{:02}:{:02}.{:02}",
        parts.hours, parts.minutes, parts.seconds, parts.fraction
    )
}
