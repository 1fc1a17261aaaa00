//! Test utilities and fixtures for songkeeper tests.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{temp_catalog, mock_song};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (mut catalog, _dir) = temp_catalog().await;
//!     catalog.insert_song(mock_song("a.mp3", "hash-a")).unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use crate::db::Catalog;
use crate::importer::Unrestricted;
use crate::library::Library;
use crate::metadata::{ExtractedMetadata, MetadataExtractor};
use crate::model::{Song, SongId};

/// Creates a catalog backed by a temporary database.
///
/// The database lives at `<dir>/test.db`. Keep the `TempDir` alive for the
/// duration of the test; the database is deleted when it is dropped.
pub async fn temp_catalog() -> (Catalog, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_url = format!("sqlite:{}", dir.path().join("test.db").display());
    let catalog = Catalog::open(&db_url)
        .await
        .expect("Failed to initialize test catalog");
    (catalog, dir)
}

/// Creates a library rooted at `<dir>/library` with a temporary catalog.
///
/// Metadata comes from `extractor`; sources are read without scoped access.
pub async fn temp_library(extractor: StubExtractor) -> (Library, TempDir) {
    let (catalog, dir) = temp_catalog().await;
    let root = dir.path().join("library");
    fs::create_dir_all(&root).expect("Failed to create library root");
    let library = Library::new(catalog, root, Arc::new(extractor), Arc::new(Unrestricted));
    (library, dir)
}

/// Creates a mock song with sensible defaults.
///
/// Customize with struct update syntax or by mutating fields:
///
/// ```ignore
/// let song = Song {
///     album: Some("Abbey Road".to_string()),
///     ..mock_song("a.mp3", "hash-a")
/// };
/// ```
pub fn mock_song(file_name: &str, content_hash: &str) -> Song {
    Song {
        id: SongId::new(),
        file_name: file_name.to_string(),
        folder: None,
        content_hash: content_hash.to_string(),
        imported_at: Utc::now(),
        size: 1024,
        title: "Test Track".to_string(),
        artist: "Test Artist".to_string(),
        duration: 180.0,
        lyrics: None,
        description: None,
        album: None,
        album_artist: None,
        genre: None,
        track_number: None,
        disc_number: None,
        year: None,
        composer: None,
        artwork_path: None,
        album_id: None,
    }
}

/// Writes `bytes` to `dir/name`, creating `dir` first.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create directory");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("Failed to write test file");
    path
}

/// Metadata extractor with canned results, keyed by file name.
///
/// Files without an entry get [`ExtractedMetadata::fallback`] plus the
/// default artwork, if one was set.
#[derive(Debug, Clone, Default)]
pub struct StubExtractor {
    artwork: Option<Vec<u8>>,
    per_file: HashMap<String, ExtractedMetadata>,
}

impl StubExtractor {
    /// Embedded artwork returned for every file.
    pub fn with_artwork(mut self, bytes: &[u8]) -> Self {
        self.artwork = Some(bytes.to_vec());
        for meta in self.per_file.values_mut() {
            meta.artwork.get_or_insert_with(|| bytes.to_vec());
        }
        self
    }

    /// Canned tags for one file name, starting from the fallback values.
    pub fn with_tags(mut self, file_name: &str, edit: impl FnOnce(&mut ExtractedMetadata)) -> Self {
        let mut meta = ExtractedMetadata::fallback(Path::new(file_name));
        meta.artwork = self.artwork.clone();
        edit(&mut meta);
        self.per_file.insert(file_name.to_string(), meta);
        self
    }
}

impl MetadataExtractor for StubExtractor {
    fn extract(&self, path: &Path) -> ExtractedMetadata {
        let known = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| self.per_file.get(name));
        match known {
            Some(meta) => meta.clone(),
            None => {
                let mut meta = ExtractedMetadata::fallback(path);
                meta.artwork = self.artwork.clone();
                meta
            }
        }
    }
}
