//!
//! src/frame.rs
//!
//! Decoder for the analyzer's framed stdout stream: one byte buffer with
//! literal ASCII markers in a fixed order. Each section is recovered by
//! prefix-splitting on the next expected marker; a missing marker fails
//! the whole frame, never a partial result.
//!

use thiserror::Error;

use crate::types::{AnalysisResult, SourceType};

pub const MARKER_START: &str = "WAVEPLOT_START";
pub const MARKER_LARGE_THUMB: &str = "WAVEPLOT_LARGE_THUMB";
pub const MARKER_SMALL_THUMB: &str = "WAVEPLOT_SMALL_THUMB";
pub const MARKER_DR: &str = "WAVEPLOT_DR";
pub const MARKER_INFO: &str = "WAVEPLOT_INFO";
pub const MARKER_END: &str = "WAVEPLOT_END";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing {0} marker")]
    MissingMarker(&'static str),
    #[error("malformed info record: expected 4 fields, got {0}")]
    InfoFieldCount(usize),
    #[error("bad {field} field: {value:?}")]
    BadField { field: &'static str, value: String },
}

/// Framing variants emitted by different analyzer generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSchema {
    /// `START <image> DR <dr> INFO <info> END`
    Classic,
    /// `START <image> LARGE_THUMB <large> SMALL_THUMB <small> DR <dr> INFO <info> END`
    Thumbnailed,
}

impl FrameSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameSchema::Classic => "classic",
            FrameSchema::Thumbnailed => "thumbs",
        }
    }
    pub fn parse(s: &str) -> Option<FrameSchema> {
        match s {
            "classic" => Some(FrameSchema::Classic),
            "thumbs" => Some(FrameSchema::Thumbnailed),
            _ => None,
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Splits `buf` on the first occurrence of `marker`: bytes before it,
/// bytes after it.
fn split_on<'a>(buf: &'a [u8], marker: &'static str) -> Result<(&'a [u8], &'a [u8]), FrameError> {
    let at = find(buf, marker.as_bytes()).ok_or(FrameError::MissingMarker(marker))?;
    Ok((&buf[..at], &buf[at + marker.len()..]))
}

fn text_section<'a>(section: &'a [u8], field: &'static str) -> Result<&'a str, FrameError> {
    std::str::from_utf8(section).map_err(|_| FrameError::BadField {
        field,
        value: String::from_utf8_lossy(section).into_owned(),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

pub fn decode(raw: &[u8], schema: FrameSchema) -> Result<AnalysisResult, FrameError> {
    // everything before the first marker is analyzer chatter
    let (_preamble, rest) = split_on(raw, MARKER_START)?;

    let (image, large_thumbnail, small_thumbnail, rest) = match schema {
        FrameSchema::Classic => {
            let (image, rest) = split_on(rest, MARKER_DR)?;
            (image, None, None, rest)
        }
        FrameSchema::Thumbnailed => {
            let (image, rest) = split_on(rest, MARKER_LARGE_THUMB)?;
            let (large, rest) = split_on(rest, MARKER_SMALL_THUMB)?;
            let (small, rest) = split_on(rest, MARKER_DR)?;
            (image, Some(large), Some(small), rest)
        }
    };

    let (dr_section, rest) = split_on(rest, MARKER_INFO)?;
    let (info_section, _trailing) = split_on(rest, MARKER_END)?;

    let dr_text = text_section(dr_section, "dr_level")?;
    let dynamic_range: f64 = dr_text.trim().parse().map_err(|_| FrameError::BadField {
        field: "dr_level",
        value: dr_text.trim().to_string(),
    })?;

    let info_text = text_section(info_section, "info")?;
    let fields: Vec<&str> = info_text.split('|').collect();
    if fields.len() != 4 {
        return Err(FrameError::InfoFieldCount(fields.len()));
    }

    let duration: f64 = fields[0].trim().parse().map_err(|_| FrameError::BadField {
        field: "length",
        value: fields[0].to_string(),
    })?;
    let trimmed = parse_bool(fields[1]).ok_or_else(|| FrameError::BadField {
        field: "trimmed",
        value: fields[1].to_string(),
    })?;
    let source_type = SourceType::parse(fields[2].trim());
    let channel_count: u32 = fields[3].trim().parse().map_err(|_| FrameError::BadField {
        field: "num_channels",
        value: fields[3].to_string(),
    })?;

    Ok(AnalysisResult {
        dynamic_range,
        duration,
        trimmed,
        source_type,
        channel_count,
        image: image.to_vec(),
        large_thumbnail: large_thumbnail.map(|bytes: &[u8]| bytes.to_vec()),
        small_thumbnail: small_thumbnail.map(|bytes: &[u8]| bytes.to_vec()),
    })
}
