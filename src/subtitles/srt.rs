use std::fmt;

use super::{cue_text, decode_cues, split_seconds, SubtitleSegment};
use crate::error::Result;

/// SRT (SubRip Subtitle) entry
#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    /// Sequential number, 1-based
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Subtitle text
    pub text: String,
}

impl SrtEntry {
    /// Create a new SRT entry
    pub fn new(index: usize, segment: &SubtitleSegment) -> Self {
        Self {
            index,
            start: segment.start,
            end: segment.end,
            text: cue_text(&segment.text),
        }
    }
}

impl fmt::Display for SrtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Encode segments as an SRT document, in caller order
pub fn encode(segments: &[SubtitleSegment]) -> String {
    let mut srt_content = String::new();

    for (i, segment) in segments.iter().enumerate() {
        srt_content.push_str(&SrtEntry::new(i + 1, segment).to_string());
        srt_content.push('\n');
    }

    srt_content
}

/// Decode an SRT document back into segments
pub fn decode(content: &str) -> Result<Vec<SubtitleSegment>> {
    decode_cues(content.trim_start_matches('\u{feff}'), ',')
}

/// Format seconds as SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let parts = split_seconds(seconds, 1000);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        parts.hours, parts.minutes, parts.seconds, parts.fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_entry_display() {
        let entry = SrtEntry::new(1, &SubtitleSegment::new(10.0, 15.0, "  Test subtitle \n"));

        assert_eq!(entry.text, "Test subtitle");
        assert_eq!(entry.to_string(), "1\n00:00:10,000 --> 00:00:15,000\nTest subtitle\n");
    }

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(3725.4), "01:02:05,400");
        assert_eq!(format_timestamp(3661.0), "01:01:01,000");
        assert_eq!(format_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(5.2), "00:00:05,200");
    }

    #[test]
    fn test_encode_document() {
        let segments = vec![
            SubtitleSegment::new(0.0, 2.0, "hi"),
            SubtitleSegment::new(2.0, 5.0, " there "),
        ];

        assert_eq!(
            encode(&segments),
            "1\n00:00:00,000 --> 00:00:02,000\nhi\n\n\
             2\n00:00:02,000 --> 00:00:05,000\nthere\n\n"
        );
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&[]), "");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_keeps_order_and_text() {
        let segments = vec![
            SubtitleSegment::new(0.0, 2.0, "hi"),
            SubtitleSegment::new(1.5, 5.001, "overlapping\nsecond line"),
            SubtitleSegment::new(5.0, 5.2, "x"),
            SubtitleSegment::new(3725.4, 3727.125, "late"),
        ];

        let decoded = decode(&encode(&segments)).unwrap();

        assert_eq!(decoded.len(), segments.len());
        for (original, back) in segments.iter().zip(&decoded) {
            assert!((original.start - back.start).abs() < 0.001);
            assert!((original.end - back.end).abs() < 0.001);
            assert_eq!(original.text, back.text);
        }
    }

    #[test]
    fn test_blank_line_in_text_keeps_cues_intact() {
        let segments = vec![
            SubtitleSegment::new(0.0, 2.0, "a\n\nb"),
            SubtitleSegment::new(2.0, 4.0, "next"),
        ];
        let srt = encode(&segments);

        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\na\nb\n\n2\n"));
        let decoded = decode(&srt).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].text, "a\nb");
        assert_eq!(decoded[1], SubtitleSegment::new(2.0, 4.0, "next"));
    }

    #[test]
    fn test_decode_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nHello\r\n\r\n";
        let decoded = decode(content).unwrap();

        assert_eq!(decoded, vec![SubtitleSegment::new(1.0, 2.5, "Hello")]);
    }

    #[test]
    fn test_decode_rejects_bad_timing() {
        assert!(decode("1\n00:00:01.000 --> 00:00:02.000\nwrong separator\n").is_err());
        assert!(decode("1\nno timing here\n").is_err());
    }
}
