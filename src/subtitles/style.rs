//! Style mapping from user-facing caption styles to ASS style records.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ass::Canvas;

pub const DEFAULT_FONT: &str = "Impact";
pub const DEFAULT_FONT_SIZE: u32 = 72;
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
pub const DEFAULT_OUTLINE_WIDTH: u32 = 4;

/// Shadow depth used whenever an outline is drawn
const OUTLINE_SHADOW: u32 = 2;
/// Vertical margin as a fraction of canvas height
const MARGIN_V_FRACTION: f64 = 0.15;
const MARGIN_H: u32 = 40;
/// Opaque white in ASS `&HAABBGGRR` notation
const FALLBACK_COLOR: &str = "&H00FFFFFF";
/// ASS alpha 00 is fully opaque
const OPAQUE_ALPHA: &str = "00";

/// Caption style supplied by the caller; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_size: Option<u32>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub all_caps: Option<bool>,
    /// `#RRGGBB` or `#RRGGBBAA`
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub outline_enabled: Option<bool>,
    #[serde(default)]
    pub outline_color: Option<String>,
    #[serde(default)]
    pub outline_width: Option<u32>,
}

impl StyleSpec {
    /// True when no field was supplied (`{}` on the wire)
    pub fn is_empty(&self) -> bool {
        self == &StyleSpec::default()
    }

    pub fn all_caps(&self) -> bool {
        self.all_caps.unwrap_or(false)
    }
}

/// Horizontal caption placement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    /// Parse an alignment name; unknown values center the caption
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "left" => Alignment::Left,
            "right" => Alignment::Right,
            _ => Alignment::Center,
        }
    }

    /// ASS numpad anchor code
    pub fn anchor_code(&self) -> u8 {
        match self {
            Alignment::Left => 7,
            Alignment::Center => 2,
            Alignment::Right => 9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

impl From<String> for Alignment {
    fn from(name: String) -> Self {
        Alignment::from_name(&name)
    }
}

impl From<Alignment> for String {
    fn from(alignment: Alignment) -> Self {
        alignment.as_str().to_string()
    }
}

fn hex_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#?([a-fA-F0-9]{6})([a-fA-F0-9]{2})?$").expect("static hex color pattern")
    })
}

/// Convert `#RRGGBB[AA]` to ASS `&HAABBGGRR`.
///
/// Malformed input yields opaque white instead of an error.
pub fn hex_to_ass_color(hex: &str, default_alpha: &str) -> String {
    let Some(caps) = hex_color_pattern().captures(hex.trim()) else {
        return FALLBACK_COLOR.to_string();
    };

    let rgb = &caps[1];
    let (r, g, b) = (&rgb[0..2], &rgb[2..4], &rgb[4..6]);
    let alpha = caps.get(2).map_or(default_alpha, |m| m.as_str());

    format!("&H{}{}{}{}", alpha, b, g, r).to_uppercase()
}

/// A fully resolved ASS style record
#[derive(Debug, Clone, PartialEq)]
pub struct AssStyle {
    pub font_name: String,
    pub font_size: u32,
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
    pub shadow: u32,
    pub alignment: u8,
    pub margin_v: u32,
}

impl AssStyle {
    /// Resolve a caller style against the fixed defaults for the given canvas
    pub fn from_spec(spec: &StyleSpec, canvas: Canvas) -> Self {
        let font_name = spec
            .font_family
            .as_deref()
            .map(sanitize_font_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_FONT.to_string());

        let font_size = spec
            .font_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_FONT_SIZE);

        let outline = if spec.outline_enabled.unwrap_or(true) {
            spec.outline_width.unwrap_or(DEFAULT_OUTLINE_WIDTH)
        } else {
            0
        };
        let shadow = if outline > 0 { OUTLINE_SHADOW } else { 0 };

        Self {
            font_name,
            font_size,
            primary_colour: hex_to_ass_color(
                spec.text_color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR),
                OPAQUE_ALPHA,
            ),
            outline_colour: hex_to_ass_color(
                spec.outline_color.as_deref().unwrap_or(DEFAULT_OUTLINE_COLOR),
                OPAQUE_ALPHA,
            ),
            outline,
            shadow,
            alignment: spec.alignment.unwrap_or_default().anchor_code(),
            margin_v: (canvas.height as f64 * MARGIN_V_FRACTION).floor() as u32,
        }
    }

    /// The `Style:` line for the `[V4+ Styles]` section
    pub fn style_line(&self) -> String {
        format!(
            "Style: Default,{},{},{},&H000000FF,{},&H80000000,-1,0,0,0,100,100,0,0,1,{},{},{},{},{},{},1",
            self.font_name,
            self.font_size,
            self.primary_colour,
            self.outline_colour,
            self.outline,
            self.shadow,
            self.alignment,
            MARGIN_H,
            MARGIN_H,
            self.margin_v
        )
    }
}

/// Collapse whitespace and drop commas, which would split the style record
fn sanitize_font_name(name: &str) -> String {
    name.replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
