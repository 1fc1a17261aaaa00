//! Core data models for the music library.
//!
//! Defines the catalog entities: [`Song`], [`Album`] and [`Settings`].
//!
//! A song refers to its album by id ([`Song::album_id`]); the album owns the
//! set of member ids. Both sides are kept in step by the catalog store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

record_id!(
    /// Stable identity of a song, assigned at import.
    SongId
);

record_id!(
    /// Stable identity of an album.
    AlbumId
);

/// A single audio file in the managed library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    /// Leaf file name inside the managed tree
    pub file_name: String,
    /// Sub-folder of the managed root the file was placed in (None = root)
    pub folder: Option<String>,
    /// SHA-256 hex digest of the file bytes, unique across the catalog
    pub content_hash: String,
    pub imported_at: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
    pub title: String,
    pub artist: String,
    /// Duration in seconds
    pub duration: f64,
    pub lyrics: Option<String>,
    pub description: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub year: Option<i32>,
    pub composer: Option<String>,
    /// Cached artwork file, if any
    pub artwork_path: Option<PathBuf>,
    /// Owning album (non-owning back-reference)
    pub album_id: Option<AlbumId>,
}

impl Song {
    /// Path of the file relative to the managed root, as recorded at import.
    pub fn relative_path(&self) -> PathBuf {
        match &self.folder {
            Some(folder) => Path::new(folder).join(&self.file_name),
            None => PathBuf::from(&self.file_name),
        }
    }

    /// Artist used for album grouping: album-artist when present, else track artist.
    pub fn album_grouping_artist(&self) -> Option<&str> {
        self.album_artist
            .as_deref()
            .or(Some(self.artist.as_str()))
            .filter(|a| !a.is_empty())
    }
}

/// Albums are unique by (name, artist).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlbumKey {
    pub name: String,
    pub artist: Option<String>,
}

impl AlbumKey {
    pub fn new(name: &str, artist: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            artist: artist.map(str::to_string),
        }
    }
}

/// A grouping of songs sharing album name and artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub artist: Option<String>,
    pub year: Option<i32>,
    pub artwork_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    /// Member songs (order irrelevant)
    pub songs: BTreeSet<SongId>,
}

impl Album {
    /// Create an empty album.
    pub fn new(name: &str, artist: Option<&str>, year: Option<i32>, artwork_path: Option<PathBuf>) -> Self {
        Self {
            id: AlbumId::new(),
            name: name.to_string(),
            artist: artist.map(str::to_string),
            year,
            artwork_path,
            created_at: Utc::now(),
            songs: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> AlbumKey {
        AlbumKey::new(&self.name, self.artist.as_deref())
    }

    pub fn song_count(&self) -> usize {
        self.songs.len()
    }
}

/// Persisted user settings (a single record).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Place imports in per-album subfolders instead of the root
    pub group_by_album: bool,
}

/// Synchronizer state as seen by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    /// A pass is running; the message describes the current step
    Scanning(String),
    /// The last pass finished
    Complete,
}

impl SyncStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, SyncStatus::Scanning(_))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Scanning(msg) => write!(f, "scanning: {}", msg),
            SyncStatus::Complete => write!(f, "complete"),
        }
    }
}
