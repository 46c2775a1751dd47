//!
//! src/identity.rs
//!
//! Reads the MusicBrainz identity of an audio file from its container
//! tags. Absence of identity is a normal outcome, never an error; files
//! lofty does not recognize simply yield no identity.
//!

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

use crate::types::TrackIdentity;

/// Seam between the orchestrator and whatever supplies identities.
pub trait IdentityReader: Send + Sync {
    /// `None` means the file is not a recognized audio container.
    /// Fields the container does not carry come back empty.
    fn identify(&self, path: &Path) -> Option<TrackIdentity>;
}

/// Tag-backed reader; lofty normalizes tag names across formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagIdentityReader;

fn first_non_empty<F>(primary_tag: Option<&Tag>, tags: &[Tag], mut extract: F) -> String
where
    F: FnMut(&Tag) -> Option<String>,
{
    for tag in primary_tag.into_iter().chain(tags.iter()) {
        if let Some(value) = extract(tag) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

/// Containers store track/disc positions as `"3"` or `"3/12"`; the
/// catalog wants the bare index.
fn normalize_index(raw: &str) -> String {
    raw.split('/').next().unwrap_or_default().trim().to_string()
}

impl IdentityReader for TagIdentityReader {
    fn identify(&self, path: &Path) -> Option<TrackIdentity> {
        let tagged_file = read_from_path(path).ok()?;
        let primary_tag = tagged_file.primary_tag();
        let tags = tagged_file.tags();

        let recording_id = first_non_empty(primary_tag, tags, |tag| {
            tag.get_string(&ItemKey::MusicBrainzRecordingId).map(str::to_string)
        });
        let release_id = first_non_empty(primary_tag, tags, |tag| {
            tag.get_string(&ItemKey::MusicBrainzReleaseId).map(str::to_string)
        });
        let track_number = first_non_empty(primary_tag, tags, |tag| {
            tag.get_string(&ItemKey::TrackNumber)
                .map(str::to_string)
                .or_else(|| tag.track().map(|value| value.to_string()))
        });
        let disc_number = first_non_empty(primary_tag, tags, |tag| {
            tag.get_string(&ItemKey::DiscNumber)
                .map(str::to_string)
                .or_else(|| tag.disk().map(|value| value.to_string()))
        });

        Some(TrackIdentity {
            recording_id,
            release_id,
            track_number: normalize_index(&track_number),
            disc_number: normalize_index(&disc_number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::config::WriteOptions;
    use lofty::file::AudioFile;
    use lofty::tag::TagType;

    #[test]
    fn index_normalization() {
        assert_eq!(normalize_index("3/12"), "3");
        assert_eq!(normalize_index(" 3 "), "3");
        assert_eq!(normalize_index("7"), "7");
        assert_eq!(normalize_index(""), "");
    }

    #[test]
    fn unrecognized_file_yields_no_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not an audio container").unwrap();

        assert!(TagIdentityReader.identify(&path).is_none());
    }

    fn write_silent_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn reads_identity_from_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.wav");
        write_silent_wav(&path);

        let mut tagged_file = read_from_path(&path).unwrap();
        tagged_file.insert_tag(Tag::new(TagType::Id3v2));
        let tag = tagged_file.tag_mut(TagType::Id3v2).unwrap();
        tag.insert_text(ItemKey::MusicBrainzRecordingId, "r1".to_string());
        tag.insert_text(ItemKey::MusicBrainzReleaseId, "a1".to_string());
        tag.insert_text(ItemKey::TrackNumber, "3/12".to_string());
        tag.insert_text(ItemKey::DiscNumber, "1/2".to_string());
        tagged_file.save_to_path(&path, WriteOptions::default()).unwrap();

        let identity = TagIdentityReader.identify(&path).expect("tagged wav is recognized");
        assert_eq!(identity.recording_id, "r1");
        assert_eq!(identity.release_id, "a1");
        assert_eq!(identity.track_number, "3");
        assert_eq!(identity.disc_number, "1");
        assert!(identity.is_complete());
    }

    #[test]
    fn untagged_audio_yields_incomplete_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.wav");
        write_silent_wav(&path);

        let identity = TagIdentityReader.identify(&path).expect("wav is recognized");
        assert!(!identity.is_complete());
    }
}
