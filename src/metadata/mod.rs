//! Audio file metadata extraction.
//!
//! Uses the lofty crate for format-independent tag access across MP3 (ID3),
//! FLAC/OGG/Opus (Vorbis comments), M4A (MP4 atoms), WAV/AIFF and friends.
//!
//! Extraction never fails from the caller's point of view: anything lofty
//! cannot read degrades to [`ExtractedMetadata::fallback`], which uses the
//! file's base name as the title and "Unknown Artist" as the artist.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Artist used when the tags carry none.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Normalized metadata for one audio file.
///
/// Transient: consumed immediately to build a song record. Artwork bytes are
/// routed through the artwork cache and never stored on the song directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub year: Option<i32>,
    pub lyrics: Option<String>,
    pub description: Option<String>,
    /// First embedded picture found, as raw bytes
    pub artwork: Option<Vec<u8>>,
    /// Duration in seconds
    pub duration: f64,
}

impl ExtractedMetadata {
    /// Best-effort defaults for a file whose tags could not be read.
    pub fn fallback(path: &Path) -> Self {
        Self {
            title: base_name(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
            album_artist: None,
            genre: None,
            composer: None,
            track_number: None,
            disc_number: None,
            year: None,
            lyrics: None,
            description: None,
            artwork: None,
            duration: 0.0,
        }
    }
}

/// Source of metadata for the import pipeline.
///
/// Implementations must not fail: return [`ExtractedMetadata::fallback`]
/// (or a partially filled record) instead.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> ExtractedMetadata;
}

/// Tag reader backed by lofty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyExtractor;

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> ExtractedMetadata {
        match read(path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!(target: "metadata", path = %path.display(), error = %e, "Falling back to default metadata");
                ExtractedMetadata::fallback(path)
            }
        }
    }
}

/// Run an extractor on the blocking pool so tag parsing never stalls the caller.
pub async fn extract_async(
    extractor: Arc<dyn MetadataExtractor>,
    path: PathBuf,
) -> ExtractedMetadata {
    let fallback_path = path.clone();
    match tokio::task::spawn_blocking(move || extractor.extract(&path)).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(target: "metadata", path = %fallback_path.display(), error = %e, "Extraction task failed");
            ExtractedMetadata::fallback(&fallback_path)
        }
    }
}

/// Read and normalize the tags of an audio file.
///
/// Unlike [`LoftyExtractor::extract`] this reports probe/parse failures.
pub fn read(path: &Path) -> Result<ExtractedMetadata> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for probing: {e}")))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file metadata: {e}")))?;

    let mut meta = ExtractedMetadata::fallback(path);
    meta.duration = tagged_file.properties().duration().as_secs_f64();

    // Primary tag first, then whichever tag the container happens to carry
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(meta);
    };

    if let Some(title) = non_empty(tag.title().as_deref()) {
        meta.title = title;
    }
    if let Some(artist) = non_empty(tag.artist().as_deref()) {
        meta.artist = artist;
    }
    meta.album = non_empty(tag.album().as_deref());
    meta.genre = non_empty(tag.genre().as_deref());
    meta.album_artist = non_empty(tag.get_string(&ItemKey::AlbumArtist));
    meta.composer = non_empty(tag.get_string(&ItemKey::Composer));
    meta.lyrics = non_empty(tag.get_string(&ItemKey::Lyrics));
    meta.description = non_empty(tag.comment().as_deref());

    meta.track_number = tag
        .get_string(&ItemKey::TrackNumber)
        .and_then(parse_number_field)
        .or_else(|| tag.track().filter(|n| *n > 0));
    meta.disc_number = tag
        .get_string(&ItemKey::DiscNumber)
        .and_then(parse_number_field)
        .or_else(|| tag.disk().filter(|n| *n > 0));
    meta.year = read_year(tag);

    meta.artwork = tag
        .pictures()
        .first()
        .map(|p| p.data().to_vec())
        .filter(|data| !data.is_empty());

    Ok(meta)
}

fn read_year(tag: &Tag) -> Option<i32> {
    tag.get_string(&ItemKey::Year)
        .and_then(parse_year)
        .or_else(|| tag.get_string(&ItemKey::RecordingDate).and_then(parse_year))
        .or_else(|| tag.year().and_then(|y| i32::try_from(y).ok()).filter(|y| *y > 0))
}

/// Parse a track or disc number in "N" or "N/total" form.
///
/// Garbage and zero yield `None` rather than an error.
pub fn parse_number_field(raw: &str) -> Option<u32> {
    let head = raw.split('/').next()?.trim();
    head.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Parse a year from a bare year ("1997") or an ISO date prefix ("1997-03-11").
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse::<i32>().ok().filter(|y| *y > 0)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}
