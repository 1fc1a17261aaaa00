//! Catalog store for songs, albums and settings.
//!
//! Uses SQLx with SQLite for persistence. The catalog keeps the full record
//! set in memory with two lookup indexes (content hash → song, album key →
//! album) and a log of pending changes. Mutations only touch memory;
//! [`Catalog::flush`] writes the accumulated batch in one transaction.
//! If a flush fails the batch stays pending and the in-memory state remains
//! authoritative until the next successful flush.
//!
//! # Example
//!
//! ```ignore
//! use songkeeper::db::{Catalog, db_url};
//!
//! let mut catalog = Catalog::open(&db_url(None)).await?;
//! let newest_first = catalog.songs();
//! catalog.flush().await?;
//! ```

mod rows;

use std::collections::HashMap;
use std::path::PathBuf;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;

use crate::error::{Error, Result};
use crate::model::{Album, AlbumId, AlbumKey, Settings, Song, SongId};
use rows::{AlbumRow, SongRow};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "songkeeper.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist.
///
/// # Errors
///
/// Returns an error if creation, connection or migration fails.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// A change waiting to be written by the next flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    SaveSong(SongId),
    DeleteSong(SongId),
    SaveAlbum(AlbumId),
    DeleteAlbum(AlbumId),
    SaveSettings,
}

/// The persisted song/album/settings collection.
///
/// Owned by a single writer; not designed for concurrent mutation.
pub struct Catalog {
    pool: SqlitePool,
    songs: HashMap<SongId, Song>,
    by_hash: HashMap<String, SongId>,
    albums: HashMap<AlbumId, Album>,
    by_album_key: HashMap<AlbumKey, AlbumId>,
    settings: Option<Settings>,
    pending: Vec<Change>,
    revision: u64,
}

impl Catalog {
    /// Open (creating if needed) the catalog at `db_url` and load all records.
    pub async fn open(db_url: &str) -> Result<Self> {
        let pool = init_db(db_url).await?;
        Self::load(pool).await
    }

    /// Load all records from an initialized pool.
    pub async fn load(pool: SqlitePool) -> Result<Self> {
        let album_rows: Vec<AlbumRow> = sqlx::query_as("SELECT * FROM albums")
            .fetch_all(&pool)
            .await?;
        let song_rows: Vec<SongRow> = sqlx::query_as("SELECT * FROM songs")
            .fetch_all(&pool)
            .await?;
        let settings_row: Option<(i64,)> =
            sqlx::query_as("SELECT group_by_album FROM settings WHERE id = 1")
                .fetch_optional(&pool)
                .await?;

        let mut catalog = Self {
            pool,
            songs: HashMap::new(),
            by_hash: HashMap::new(),
            albums: HashMap::new(),
            by_album_key: HashMap::new(),
            settings: settings_row.map(|(flag,)| Settings {
                group_by_album: flag != 0,
            }),
            pending: Vec::new(),
            revision: 0,
        };

        for row in album_rows {
            match Album::try_from(row) {
                Ok(album) => {
                    catalog.by_album_key.insert(album.key(), album.id);
                    catalog.albums.insert(album.id, album);
                }
                Err(e) => tracing::warn!(target: "db", error = %e, "Skipping unreadable album row"),
            }
        }

        for row in song_rows {
            let mut song = match Song::try_from(row) {
                Ok(song) => song,
                Err(e) => {
                    tracing::warn!(target: "db", error = %e, "Skipping unreadable song row");
                    continue;
                }
            };
            match song.album_id.and_then(|id| catalog.albums.get_mut(&id)) {
                Some(album) => {
                    album.songs.insert(song.id);
                }
                None => song.album_id = None,
            }
            catalog.by_hash.insert(song.content_hash.clone(), song.id);
            catalog.songs.insert(song.id, song);
        }

        tracing::info!(
            target: "db",
            songs = catalog.songs.len(),
            albums = catalog.albums.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.songs.get(&id)
    }

    pub fn album(&self, id: AlbumId) -> Option<&Album> {
        self.albums.get(&id)
    }

    /// Dedup lookup by content hash.
    pub fn find_song_by_hash(&self, content_hash: &str) -> Option<&Song> {
        self.by_hash
            .get(content_hash)
            .and_then(|id| self.songs.get(id))
    }

    /// Lookup by the (name, artist) uniqueness key.
    pub fn find_album(&self, name: &str, artist: Option<&str>) -> Option<&Album> {
        self.by_album_key
            .get(&AlbumKey::new(name, artist))
            .and_then(|id| self.albums.get(id))
    }

    /// All songs, newest import first. This is the canonical library order.
    pub fn songs(&self) -> Vec<&Song> {
        let mut songs: Vec<&Song> = self.songs.values().collect();
        songs.sort_by(|a, b| {
            b.imported_at
                .cmp(&a.imported_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        songs
    }

    /// All albums, by name ascending.
    pub fn albums(&self) -> Vec<&Album> {
        let mut albums: Vec<&Album> = self.albums.values().collect();
        albums.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.artist.cmp(&b.artist)));
        albums
    }

    pub fn song_count(&self) -> usize {
        self.songs.len()
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    /// Monotonic counter bumped on every mutation, for change polling.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Current settings, creating the default record on first access.
    pub fn settings(&mut self) -> Settings {
        match self.settings {
            Some(settings) => settings,
            None => {
                let settings = Settings::default();
                self.settings = Some(settings);
                self.record(Change::SaveSettings);
                settings
            }
        }
    }

    /// Current settings without creating the record.
    pub fn current_settings(&self) -> Settings {
        self.settings.unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = Some(settings);
        self.record(Change::SaveSettings);
    }

    /// Insert a new song.
    ///
    /// Fails if another song already holds the same content hash. A set
    /// `album_id` is linked both ways when that album exists.
    pub fn insert_song(&mut self, mut song: Song) -> Result<SongId> {
        if let Some(existing) = self.by_hash.get(&song.content_hash) {
            return Err(Error::Duplicate(format!(
                "content {} already cataloged as {}",
                song.content_hash, existing
            )));
        }

        let id = song.id;
        match song.album_id.and_then(|album_id| self.albums.get_mut(&album_id)) {
            Some(album) => {
                album.songs.insert(id);
            }
            None => song.album_id = None,
        }

        self.by_hash.insert(song.content_hash.clone(), id);
        self.songs.insert(id, song);
        self.record(Change::SaveSong(id));
        Ok(id)
    }

    /// Insert a new album. Fails if the (name, artist) key is taken.
    pub fn insert_album(&mut self, album: Album) -> Result<AlbumId> {
        let key = album.key();
        if self.by_album_key.contains_key(&key) {
            return Err(Error::Duplicate(format!(
                "album {:?} by {:?} already exists",
                key.name, key.artist
            )));
        }

        let id = album.id;
        // Member lists are established through link_song_to_album only
        let mut album = album;
        album.songs.clear();
        self.by_album_key.insert(key, id);
        self.albums.insert(id, album);
        self.record(Change::SaveAlbum(id));
        Ok(id)
    }

    /// Delete a song, removing it from its album and deleting the album if
    /// that leaves it empty.
    pub fn delete_song(&mut self, id: SongId) -> Option<Song> {
        let song = self.songs.remove(&id)?;
        self.by_hash.remove(&song.content_hash);
        self.record(Change::DeleteSong(id));

        if let Some(album_id) = song.album_id {
            self.detach_member(album_id, id);
        }
        Some(song)
    }

    /// Delete an album record. Member songs stay; their album link is cleared.
    pub fn delete_album(&mut self, id: AlbumId) -> Option<Album> {
        let album = self.albums.remove(&id)?;
        self.by_album_key.remove(&album.key());
        self.record(Change::DeleteAlbum(id));

        for song_id in &album.songs {
            if let Some(song) = self.songs.get_mut(song_id) {
                song.album_id = None;
                self.record(Change::SaveSong(*song_id));
            }
        }
        Some(album)
    }

    /// Make `song_id` a member of `album_id`, moving it out of any previous album.
    ///
    /// Idempotent: linking a song to the album it already belongs to is a no-op.
    pub fn link_song_to_album(&mut self, song_id: SongId, album_id: AlbumId) -> Result<()> {
        if !self.albums.contains_key(&album_id) {
            return Err(Error::not_found(format!("album {}", album_id)));
        }
        let song = self
            .songs
            .get_mut(&song_id)
            .ok_or_else(|| Error::not_found(format!("song {}", song_id)))?;

        let previous = song.album_id.replace(album_id);
        if previous == Some(album_id)
            && self.albums.get(&album_id).is_some_and(|a| a.songs.contains(&song_id))
        {
            return Ok(());
        }

        if let Some(album) = self.albums.get_mut(&album_id) {
            album.songs.insert(song_id);
        }
        self.record(Change::SaveSong(song_id));

        if let Some(old) = previous.filter(|old| *old != album_id) {
            self.detach_member(old, song_id);
        }
        Ok(())
    }

    /// Replace a song's cached artwork path.
    pub fn set_song_artwork(&mut self, id: SongId, artwork_path: Option<PathBuf>) -> bool {
        match self.songs.get_mut(&id) {
            Some(song) if song.artwork_path != artwork_path => {
                song.artwork_path = artwork_path;
                self.record(Change::SaveSong(id));
                true
            }
            _ => false,
        }
    }

    /// Replace an album's artwork path.
    pub fn set_album_artwork(&mut self, id: AlbumId, artwork_path: Option<PathBuf>) -> bool {
        match self.albums.get_mut(&id) {
            Some(album) if album.artwork_path != artwork_path => {
                album.artwork_path = artwork_path;
                self.record(Change::SaveAlbum(id));
                true
            }
            _ => false,
        }
    }

    /// Record where a song's file now lives (relative folder within the root).
    pub fn set_song_folder(&mut self, id: SongId, folder: Option<String>) -> bool {
        match self.songs.get_mut(&id) {
            Some(song) if song.folder != folder => {
                song.folder = folder;
                self.record(Change::SaveSong(id));
                true
            }
            _ => false,
        }
    }

    /// Write all pending changes in one transaction.
    ///
    /// All-or-nothing: on error nothing is written and the changes stay
    /// pending for the next attempt.
    ///
    /// # Returns
    ///
    /// The number of changes written.
    pub async fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        if let Err(e) = self.write_pending(&mut tx).await {
            // Release the write lock before reporting
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(target: "db", error = %rollback, "Rollback of failed flush failed");
            }
            return Err(e);
        }
        tx.commit().await?;

        let written = self.pending.len();
        self.pending.clear();
        tracing::debug!(target: "db", changes = written, "Catalog flushed");
        Ok(written)
    }

    async fn write_pending(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        for change in &self.pending {
            match *change {
                Change::SaveSong(id) => {
                    if let Some(song) = self.songs.get(&id) {
                        rows::save_song(tx, song).await?;
                    }
                }
                Change::DeleteSong(id) => {
                    sqlx::query("DELETE FROM songs WHERE id = ?")
                        .bind(id.to_string())
                        .execute(&mut **tx)
                        .await?;
                }
                Change::SaveAlbum(id) => {
                    if let Some(album) = self.albums.get(&id) {
                        rows::save_album(tx, album).await?;
                    }
                }
                Change::DeleteAlbum(id) => {
                    sqlx::query("DELETE FROM albums WHERE id = ?")
                        .bind(id.to_string())
                        .execute(&mut **tx)
                        .await?;
                }
                Change::SaveSettings => {
                    if let Some(settings) = self.settings {
                        sqlx::query(
                            r#"
                            INSERT INTO settings (id, group_by_album) VALUES (1, ?)
                            ON CONFLICT(id) DO UPDATE SET group_by_album = excluded.group_by_album
                            "#,
                        )
                        .bind(settings.group_by_album)
                        .execute(&mut **tx)
                        .await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush, logging instead of propagating a failure.
    pub async fn flush_best_effort(&mut self) -> bool {
        match self.flush().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    target: "db",
                    error = %e,
                    pending = self.pending.len(),
                    "Catalog flush failed, changes kept in memory"
                );
                false
            }
        }
    }

    fn detach_member(&mut self, album_id: AlbumId, song_id: SongId) {
        let now_empty = match self.albums.get_mut(&album_id) {
            Some(album) => {
                album.songs.remove(&song_id);
                album.songs.is_empty()
            }
            None => false,
        };
        if now_empty {
            tracing::debug!(target: "db", album = %album_id, "Removing album left without songs");
            self.delete_album(album_id);
        }
    }

    fn record(&mut self, change: Change) {
        if self.pending.last() != Some(&change) {
            self.pending.push(change);
        }
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_song, temp_catalog};

    fn album_with(catalog: &mut Catalog, name: &str, artist: &str) -> AlbumId {
        catalog
            .insert_album(Album::new(name, Some(artist), None, None))
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_empty_catalog() {
        let (mut catalog, dir) = temp_catalog().await;
        assert!(dir.path().join("test.db").exists());
        assert_eq!(catalog.song_count(), 0);
        assert_eq!(catalog.album_count(), 0);
        assert_eq!(catalog.settings(), Settings::default());
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let (mut catalog, _dir) = temp_catalog().await;
        catalog.insert_song(mock_song("a.mp3", "same")).unwrap();

        let err = catalog.insert_song(mock_song("b.mp3", "same")).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
        assert_eq!(catalog.song_count(), 1);
        assert_eq!(catalog.find_song_by_hash("same").unwrap().file_name, "a.mp3");
    }

    #[tokio::test]
    async fn test_songs_newest_first() {
        let (mut catalog, _dir) = temp_catalog().await;
        let mut old = mock_song("old.mp3", "h1");
        old.imported_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let new = mock_song("new.mp3", "h2");
        catalog.insert_song(old).unwrap();
        catalog.insert_song(new).unwrap();

        let names: Vec<&str> = catalog.songs().iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, vec!["new.mp3", "old.mp3"]);
    }

    #[tokio::test]
    async fn test_albums_sorted_by_name() {
        let (mut catalog, _dir) = temp_catalog().await;
        album_with(&mut catalog, "Zebra", "A");
        album_with(&mut catalog, "Abbey Road", "The Beatles");
        album_with(&mut catalog, "Mezzanine", "Massive Attack");

        let names: Vec<&str> = catalog.albums().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Abbey Road", "Mezzanine", "Zebra"]);
    }

    #[tokio::test]
    async fn test_album_key_includes_artist() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = album_with(&mut catalog, "Greatest Hits", "Queen");
        let b = album_with(&mut catalog, "Greatest Hits", "ABBA");
        assert_ne!(a, b);
        assert_eq!(catalog.find_album("Greatest Hits", Some("ABBA")).unwrap().id, b);
        assert!(catalog.find_album("Greatest Hits", None).is_none());
        assert!(
            catalog
                .insert_album(Album::new("Greatest Hits", Some("Queen"), None, None))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_delete_non_last_member_keeps_album() {
        let (mut catalog, _dir) = temp_catalog().await;
        let album_id = album_with(&mut catalog, "Album", "Artist");
        let a = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        let b = catalog.insert_song(mock_song("b.mp3", "hb")).unwrap();
        catalog.link_song_to_album(a, album_id).unwrap();
        catalog.link_song_to_album(b, album_id).unwrap();
        assert_eq!(catalog.album(album_id).unwrap().song_count(), 2);

        catalog.delete_song(a).unwrap();
        let album = catalog.album(album_id).unwrap();
        assert_eq!(album.song_count(), 1);
        assert!(!album.songs.contains(&a));
    }

    #[tokio::test]
    async fn test_delete_last_member_removes_album() {
        let (mut catalog, _dir) = temp_catalog().await;
        let album_id = album_with(&mut catalog, "Album", "Artist");
        let a = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        catalog.link_song_to_album(a, album_id).unwrap();

        catalog.delete_song(a).unwrap();
        assert!(catalog.album(album_id).is_none());
        assert!(catalog.find_album("Album", Some("Artist")).is_none());
        assert!(catalog.find_song_by_hash("ha").is_none());
    }

    #[tokio::test]
    async fn test_delete_album_keeps_songs() {
        let (mut catalog, _dir) = temp_catalog().await;
        let album_id = album_with(&mut catalog, "Album", "Artist");
        let a = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        catalog.link_song_to_album(a, album_id).unwrap();

        catalog.delete_album(album_id).unwrap();
        assert_eq!(catalog.song(a).unwrap().album_id, None);
        assert_eq!(catalog.song_count(), 1);
    }

    #[tokio::test]
    async fn test_link_is_idempotent_and_moves_between_albums() {
        let (mut catalog, _dir) = temp_catalog().await;
        let first = album_with(&mut catalog, "First", "Artist");
        let second = album_with(&mut catalog, "Second", "Artist");
        let a = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();

        catalog.link_song_to_album(a, first).unwrap();
        catalog.link_song_to_album(a, first).unwrap();
        assert_eq!(catalog.album(first).unwrap().song_count(), 1);

        catalog.link_song_to_album(a, second).unwrap();
        assert_eq!(catalog.song(a).unwrap().album_id, Some(second));
        // The first album lost its only member
        assert!(catalog.album(first).is_none());
    }

    #[tokio::test]
    async fn test_flush_persists_and_reloads() {
        let (mut catalog, dir) = temp_catalog().await;
        let album_id = album_with(&mut catalog, "Album", "Artist");
        let mut song = mock_song("a.mp3", "ha");
        song.track_number = Some(4);
        song.artwork_path = Some(PathBuf::from("/cache/x.jpg"));
        let a = catalog.insert_song(song).unwrap();
        catalog.link_song_to_album(a, album_id).unwrap();
        catalog.set_settings(Settings {
            group_by_album: true,
        });

        assert!(catalog.has_pending_changes());
        catalog.flush().await.unwrap();
        assert!(!catalog.has_pending_changes());

        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let mut reloaded = Catalog::open(&url).await.unwrap();
        assert_eq!(reloaded.song_count(), 1);
        let song = reloaded.song(a).unwrap();
        assert_eq!(song.track_number, Some(4));
        assert_eq!(song.album_id, Some(album_id));
        assert_eq!(song.artwork_path, Some(PathBuf::from("/cache/x.jpg")));
        assert_eq!(reloaded.album(album_id).unwrap().song_count(), 1);
        assert!(reloaded.settings().group_by_album);
    }

    #[tokio::test]
    async fn test_flush_deletes_cascade() {
        let (mut catalog, dir) = temp_catalog().await;
        let album_id = album_with(&mut catalog, "Album", "Artist");
        let a = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        catalog.link_song_to_album(a, album_id).unwrap();
        catalog.flush().await.unwrap();

        catalog.delete_song(a);
        catalog.flush().await.unwrap();

        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let reloaded = Catalog::open(&url).await.unwrap();
        assert_eq!(reloaded.song_count(), 0);
        assert_eq!(reloaded.album_count(), 0);
    }

    #[tokio::test]
    async fn test_hash_reused_after_delete_in_same_batch() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = catalog.insert_song(mock_song("a.mp3", "same")).unwrap();
        catalog.flush().await.unwrap();

        catalog.delete_song(a);
        catalog.insert_song(mock_song("b.mp3", "same")).unwrap();
        catalog.flush().await.unwrap();
        assert_eq!(catalog.find_song_by_hash("same").unwrap().file_name, "b.mp3");
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_pending() {
        let (mut catalog, _dir) = temp_catalog().await;
        catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        catalog.pool.close().await;

        assert!(!catalog.flush_best_effort().await);
        assert!(catalog.has_pending_changes());
        assert_eq!(catalog.song_count(), 1);
    }

    #[tokio::test]
    async fn test_statement_failure_rolls_back_whole_flush() {
        let (mut catalog, _dir) = temp_catalog().await;
        catalog.set_settings(Settings {
            group_by_album: true,
        });
        let id = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();

        // A row the in-memory catalog does not know holds the same hash
        sqlx::query(
            "INSERT INTO songs (id, file_name, content_hash, imported_at, size, title, artist) \
             VALUES ('stray', 'stray.mp3', 'ha', '2026-01-01T00:00:00+00:00', 1, 'Stray', 'Nobody')",
        )
        .execute(&catalog.pool)
        .await
        .unwrap();

        // Settings are written first, then the song insert fails
        assert!(catalog.flush().await.is_err());
        let (settings_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&catalog.pool)
            .await
            .unwrap();
        assert_eq!(settings_rows, 0);
        let (song_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM songs")
            .fetch_one(&catalog.pool)
            .await
            .unwrap();
        assert_eq!(song_rows, 1);

        assert!(catalog.has_pending_changes());
        assert_eq!(catalog.song(id).unwrap().file_name, "a.mp3");
        assert!(catalog.current_settings().group_by_album);

        // The same changes go through once the conflict is gone
        sqlx::query("DELETE FROM songs WHERE id = 'stray'")
            .execute(&catalog.pool)
            .await
            .unwrap();
        assert!(catalog.flush().await.unwrap() > 0);
        assert!(!catalog.has_pending_changes());

        let reloaded = Catalog::load(catalog.pool.clone()).await.unwrap();
        assert!(reloaded.current_settings().group_by_album);
        assert_eq!(reloaded.find_song_by_hash("ha").unwrap().id, id);
    }

    #[tokio::test]
    async fn test_revision_increases_on_mutation() {
        let (mut catalog, _dir) = temp_catalog().await;
        let before = catalog.revision();
        catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        assert!(catalog.revision() > before);
    }
}
