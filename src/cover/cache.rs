//! Content-addressed artwork cache.
//!
//! Images are keyed by the SHA-256 of their bytes and stored as
//! `<hash>.jpg`, so any number of songs sharing a cover consume one file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::hash::hash_bytes;
use crate::metadata::MetadataExtractor;
use crate::model::Song;

/// Artwork disk cache.
#[derive(Debug, Clone)]
pub struct ArtworkCache {
    cache_dir: PathBuf,
}

impl ArtworkCache {
    /// Create a cache rooted at `cache_dir`. The directory is created lazily.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Store image bytes, reusing an existing file with the same content.
    ///
    /// Returns `None` for empty input or when the write fails.
    pub fn store(&self, bytes: &[u8]) -> Option<PathBuf> {
        if bytes.is_empty() {
            return None;
        }

        let path = self.cache_path(&hash_bytes(bytes));
        if path.exists() {
            return Some(path);
        }

        if let Err(e) = fs::create_dir_all(&self.cache_dir).and_then(|_| fs::write(&path, bytes)) {
            tracing::warn!(target: "cover::cache", path = %path.display(), error = %e, "Failed to write artwork");
            return None;
        }

        tracing::debug!(target: "cover::cache", path = %path.display(), "Cached artwork");
        Some(path)
    }

    /// Make sure a song's artwork points at an existing cache file.
    ///
    /// Keeps the recorded path if the file is still there, otherwise re-extracts
    /// the embedded image from `source` and stores it again. `None` means the
    /// caller should clear the song's artwork path.
    pub fn repair(
        &self,
        song: &Song,
        source: &Path,
        extractor: &dyn MetadataExtractor,
    ) -> Option<PathBuf> {
        if let Some(current) = &song.artwork_path
            && current.exists()
        {
            return Some(current.clone());
        }

        let artwork = extractor.extract(source).artwork?;
        self.store(&artwork)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cache_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", hash))
    }
}
