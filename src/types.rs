//!
//! src/types.rs
//!
//! Core data model: track identity read from tags, the decoded analyzer
//! result, and the outcome of a submission.
//!

use serde::{Deserialize, Serialize};

/// MusicBrainz identity of one file, read from its container tags.
///
/// Two files with the same identity are the same logical track as far as
/// the catalog is concerned, even when their bytes differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub recording_id: String,
    pub release_id: String,
    pub track_number: String,
    pub disc_number: String,
}

impl TrackIdentity {
    /// An identity is usable for submission only when every field is set.
    pub fn is_complete(&self) -> bool {
        !self.recording_id.is_empty()
            && !self.release_id.is_empty()
            && !self.track_number.is_empty()
            && !self.disc_number.is_empty()
    }
}

/// Identifier assigned by the catalog server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WavePlotId(pub String);

/// Server response to a submission: an assigned id, or an explicit
/// "accepted, no id" marker (empty or zero body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Assigned(WavePlotId),
    NoId,
}

impl SubmissionOutcome {
    pub fn parse(body: &str) -> SubmissionOutcome {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "0" {
            SubmissionOutcome::NoId
        } else {
            SubmissionOutcome::Assigned(WavePlotId(trimmed.to_string()))
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Assigned(WavePlotId(id)) => Some(id.as_str()),
            SubmissionOutcome::NoId => None,
        }
    }
}

/// Source classification reported by the analyzer. Anything outside the
/// named set is carried verbatim so the submission stays lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Cd,
    Vinyl,
    Digital,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Cd => "cd",
            SourceType::Vinyl => "vinyl",
            SourceType::Digital => "digital",
            SourceType::Other(raw) => raw.as_str(),
        }
    }

    pub fn parse(s: &str) -> SourceType {
        match s {
            "cd" => SourceType::Cd,
            "vinyl" => SourceType::Vinyl,
            "digital" => SourceType::Digital,
            _ => SourceType::Other(s.to_string()),
        }
    }
}

/// Everything decoded from one analyzer invocation. Built once per file,
/// consumed only to assemble the submit request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub dynamic_range: f64,
    pub duration: f64,
    pub trimmed: bool,
    pub source_type: SourceType,
    pub channel_count: u32,
    pub image: Vec<u8>,
    pub large_thumbnail: Option<Vec<u8>>,
    pub small_thumbnail: Option<Vec<u8>>,
}

/// One row of the scan ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub file_path: String,
    pub waveplot_id: Option<String>,
    pub version: String,
    pub date: i64,
}
