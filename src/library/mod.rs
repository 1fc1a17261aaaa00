//! The library service: one owner for the catalog, the managed tree and the
//! artwork cache.
//!
//! A [`Library`] is constructed once at process start and passed down to
//! whatever drives it (the CLI here). All catalog mutation goes through
//! `&mut Library`, which keeps the single-writer rule a compile-time fact.
//! Synchronization lives in [`sync`].

pub mod sync;

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;

use crate::album;
use crate::cover::{ARTWORK_DIR, ArtworkCache};
use crate::db::Catalog;
use crate::error::{Error, Result};
use crate::hash::hash_file;
use crate::importer::{self, ImportContext, ImportMode, ImportSummary, SourceAccess, Unrestricted};
use crate::metadata::{LoftyExtractor, MetadataExtractor};
use crate::model::{Album, AlbumId, Settings, Song, SongId, SyncStatus};
use crate::organizer;
pub use sync::{SyncGate, SyncPermit, SyncReport, trigger_sync};

/// Owning context for the synchronization engine.
pub struct Library {
    catalog: Catalog,
    root: PathBuf,
    artwork: ArtworkCache,
    extractor: Arc<dyn MetadataExtractor>,
    access: Arc<dyn SourceAccess>,
    status: watch::Sender<SyncStatus>,
    gate: SyncGate,
}

impl Library {
    /// Assemble a library from its collaborators.
    pub fn new(
        catalog: Catalog,
        root: PathBuf,
        extractor: Arc<dyn MetadataExtractor>,
        access: Arc<dyn SourceAccess>,
    ) -> Self {
        let artwork = ArtworkCache::new(root.join(ARTWORK_DIR));
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            catalog,
            root,
            artwork,
            extractor,
            access,
            status,
            gate: SyncGate::default(),
        }
    }

    /// Open the catalog at `db_url` for the tree at `root`, with lofty tag
    /// reading and unrestricted source access.
    pub async fn open(root: PathBuf, db_url: &str) -> Result<Self> {
        fs::create_dir_all(&root)
            .map_err(|e| Error::Io(e).context(format!("creating library root {}", root.display())))?;
        let catalog = Catalog::open(db_url).await?;
        tracing::info!(target: "library", root = %root.display(), songs = catalog.song_count(), "Library opened");
        Ok(Self::new(
            catalog,
            root,
            Arc::new(LoftyExtractor),
            Arc::new(Unrestricted),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artwork(&self) -> &ArtworkCache {
        &self.artwork
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Songs in library order (newest import first).
    pub fn songs(&self) -> Vec<&Song> {
        self.catalog.songs()
    }

    /// Albums by name.
    pub fn albums(&self) -> Vec<&Album> {
        self.catalog.albums()
    }

    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.catalog.song(id)
    }

    pub fn album(&self, id: AlbumId) -> Option<&Album> {
        self.catalog.album(id)
    }

    /// Settings, created with defaults on first access.
    pub fn settings(&mut self) -> Settings {
        self.catalog.settings()
    }

    /// Change the grouping flag. Only affects future imports; nothing moves.
    pub async fn set_group_by_album(&mut self, group_by_album: bool) -> Settings {
        let settings = Settings { group_by_album };
        self.catalog.set_settings(settings);
        self.catalog.flush_best_effort().await;
        settings
    }

    /// Write pending catalog changes; failures are logged and retried later.
    pub async fn flush(&mut self) -> bool {
        self.catalog.flush_best_effort().await
    }

    /// Latest synchronizer status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Observe synchronizer status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Handle for coalescing synchronization triggers from other tasks.
    pub fn sync_gate(&self) -> SyncGate {
        self.gate.clone()
    }

    /// Resolve a song to its playable file.
    ///
    /// Recomputed on every call: the recorded location when the file is there,
    /// otherwise the settings-derived location if it holds this song's bytes.
    /// When neither does, the recorded path is returned.
    pub fn locate(&self, id: SongId) -> Option<PathBuf> {
        let song = self.catalog.song(id)?;
        let recorded = self.root.join(song.relative_path());
        if recorded.is_file() {
            return Some(recorded);
        }
        let group = self.catalog.current_settings().group_by_album;
        let claimed = self.recorded_locations();
        Some(resolve_location(&self.root, song, group, &claimed).unwrap_or(recorded))
    }

    /// Absolute paths the catalog records for its songs.
    pub(crate) fn recorded_locations(&self) -> HashSet<PathBuf> {
        self.catalog
            .songs()
            .iter()
            .map(|song| self.root.join(song.relative_path()))
            .collect()
    }

    /// The song after `id` in library order.
    pub fn next_song(&self, id: SongId) -> Option<&Song> {
        let songs = self.catalog.songs();
        let index = songs.iter().position(|s| s.id == id)?;
        songs.get(index + 1).copied()
    }

    /// The song before `id` in library order.
    pub fn previous_song(&self, id: SongId) -> Option<&Song> {
        let songs = self.catalog.songs();
        let index = songs.iter().position(|s| s.id == id)?;
        index.checked_sub(1).and_then(|i| songs.get(i).copied())
    }

    /// Copy external files into the managed tree.
    ///
    /// Each source is imported independently; failures and duplicates are
    /// counted in the summary. Album membership is reconciled and the catalog
    /// flushed once at the end.
    pub async fn import(&mut self, sources: &[PathBuf]) -> ImportSummary {
        let group_by_album = self.catalog.settings().group_by_album;
        let ctx = ImportContext {
            root: &self.root,
            artwork: &self.artwork,
            extractor: Arc::clone(&self.extractor),
            access: self.access.as_ref(),
            group_by_album,
        };
        let summary = importer::import_batch(&ctx, &mut self.catalog, sources, ImportMode::Copy).await;

        album::reconcile(&mut self.catalog);
        self.catalog.flush_best_effort().await;

        tracing::info!(
            target: "library",
            imported = summary.imported,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "Import finished"
        );
        summary
    }

    /// Delete a song at the user's request.
    ///
    /// The backing file is removed first (a file that is already gone is
    /// fine) so the next synchronization does not adopt it again. The album
    /// loses the member and disappears if it was the last one.
    pub async fn delete_song(&mut self, id: SongId) -> Result<Song> {
        let path = self
            .locate(id)
            .ok_or_else(|| Error::not_found(format!("song {}", id)))?;

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Io(e).context(format!("removing {}", path.display())));
            }
        }

        let song = self
            .catalog
            .delete_song(id)
            .ok_or_else(|| Error::not_found(format!("song {}", id)))?;
        self.catalog.flush_best_effort().await;
        tracing::info!(target: "library", song = %id, path = %path.display(), "Song deleted");
        Ok(song)
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }
}

/// Find a song's file on disk.
///
/// The recorded location wins whenever a file is there. The location the
/// grouping setting would give is accepted only when no other song records it
/// and it holds this song's bytes (size first, then content hash).
pub(crate) fn resolve_location(
    root: &Path,
    song: &Song,
    group_by_album: bool,
    claimed: &HashSet<PathBuf>,
) -> Option<PathBuf> {
    let recorded = root.join(song.relative_path());
    if recorded.is_file() {
        return Some(recorded);
    }

    let expected = organizer::album_directory(root, song.album.as_deref(), group_by_album)
        .join(&song.file_name);
    if expected == recorded || claimed.contains(&expected) {
        return None;
    }
    holds_content(&expected, song).then_some(expected)
}

fn holds_content(path: &Path, song: &Song) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == song.size => {}
        _ => return false,
    }
    hash_file(path).is_ok_and(|hash| hash == song.content_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use crate::test_utils::{StubExtractor, temp_library, write_file};

    fn grouped_tags() -> StubExtractor {
        StubExtractor::default()
            .with_tags("a.mp3", |m| {
                m.title = "A".into();
                m.artist = "Artist".into();
                m.album = Some("Record".into());
                m.track_number = Some(1);
            })
            .with_tags("b.mp3", |m| {
                m.title = "B".into();
                m.artist = "Artist".into();
                m.album = Some("Record".into());
                m.track_number = Some(2);
            })
    }

    #[tokio::test]
    async fn test_import_then_locate() {
        let (mut library, dir) = temp_library(grouped_tags()).await;
        let source = write_file(&dir.path().join("incoming"), "a.mp3", b"audio-a");

        let summary = library.import(&[source]).await;
        assert_eq!(summary.imported, 1);
        assert!(!library.catalog().has_pending_changes());

        let id = summary.songs[0];
        let location = library.locate(id).unwrap();
        assert_eq!(location, library.root().join("01 - Artist - A.mp3"));
        assert!(location.exists());
    }

    #[tokio::test]
    async fn test_settings_toggle_does_not_move_files() {
        let (mut library, dir) = temp_library(grouped_tags()).await;
        let incoming = dir.path().join("incoming");
        let a = write_file(&incoming, "a.mp3", b"audio-a");
        let b = write_file(&incoming, "b.mp3", b"audio-b");

        let first = library.import(&[a]).await.songs[0];
        let flat_path = library.root().join("01 - Artist - A.mp3");
        assert!(flat_path.exists());

        library.set_group_by_album(true).await;
        assert!(library.settings().group_by_album);

        let second = library.import(&[b]).await.songs[0];
        // The earlier import stays where it was and is still playable
        assert!(flat_path.exists());
        assert_eq!(library.locate(first).unwrap(), flat_path);
        // Only the new import went into the album folder
        let grouped_path = library.root().join("Record").join("02 - Artist - B.mp3");
        assert!(grouped_path.exists());
        assert_eq!(library.locate(second).unwrap(), grouped_path);
    }

    #[tokio::test]
    async fn test_delete_song_removes_file_and_album() {
        let (mut library, dir) = temp_library(grouped_tags()).await;
        let incoming = dir.path().join("incoming");
        let a = write_file(&incoming, "a.mp3", b"audio-a");
        let b = write_file(&incoming, "b.mp3", b"audio-b");
        let summary = library.import(&[a, b]).await;
        let (first, second) = (summary.songs[0], summary.songs[1]);
        let album_id = library.song(first).unwrap().album_id.unwrap();
        assert_eq!(library.album(album_id).unwrap().song_count(), 2);

        let path = library.locate(first).unwrap();
        library.delete_song(first).await.unwrap();
        assert!(!path.exists());
        assert_eq!(library.album(album_id).unwrap().song_count(), 1);

        library.delete_song(second).await.unwrap();
        assert!(library.album(album_id).is_none());
        assert!(library.albums().is_empty());

        assert!(matches!(
            library.delete_song(second).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_next_and_previous_follow_library_order() {
        let (mut library, dir) = temp_library(grouped_tags()).await;
        let incoming = dir.path().join("incoming");
        let a = write_file(&incoming, "a.mp3", b"audio-a");
        let b = write_file(&incoming, "b.mp3", b"audio-b");
        library.import(&[a, b]).await;

        let order: Vec<SongId> = library.songs().iter().map(|s| s.id).collect();
        assert_eq!(order.len(), 2);
        assert_eq!(library.next_song(order[0]).map(|s| s.id), Some(order[1]));
        assert!(library.next_song(order[1]).is_none());
        assert_eq!(library.previous_song(order[1]).map(|s| s.id), Some(order[0]));
        assert!(library.previous_song(order[0]).is_none());
        assert!(library.next_song(SongId::new()).is_none());
    }

    #[tokio::test]
    async fn test_status_starts_idle() {
        let (library, _dir) = temp_library(StubExtractor::default()).await;
        assert_eq!(library.status(), SyncStatus::Idle);
        assert_eq!(*library.subscribe_status().borrow(), SyncStatus::Idle);
    }

    #[test]
    fn test_resolve_location_verifies_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut song = crate::test_utils::mock_song("x.mp3", &hash_bytes(b"mine"));
        song.size = 4;
        song.album = Some("Record".into());
        let unclaimed = HashSet::new();

        assert_eq!(resolve_location(root, &song, true, &unclaimed), None);

        // Same name and size, different bytes
        let grouped = write_file(&root.join("Record"), "x.mp3", b"ours");
        assert_eq!(resolve_location(root, &song, true, &unclaimed), None);

        fs::write(&grouped, b"mine").unwrap();
        assert_eq!(
            resolve_location(root, &song, true, &unclaimed),
            Some(grouped.clone())
        );

        // Another song records that location
        let claimed = HashSet::from([grouped.clone()]);
        assert_eq!(resolve_location(root, &song, true, &claimed), None);

        // The recorded location wins whatever it holds
        let recorded = write_file(root, "x.mp3", b"anything");
        assert_eq!(resolve_location(root, &song, true, &claimed), Some(recorded));
    }

    #[tokio::test]
    async fn test_locate_ignores_a_stranger_at_the_grouped_path() {
        let (mut library, dir) = temp_library(grouped_tags()).await;
        let source = write_file(&dir.path().join("incoming"), "a.mp3", b"audio-a");
        let id = library.import(&[source]).await.songs[0];
        library.set_group_by_album(true).await;

        let recorded = library.locate(id).unwrap();
        let name = recorded.file_name().unwrap().to_owned();
        fs::remove_file(&recorded).unwrap();
        let stranger = write_file(&library.root().join("Record"), name.to_str().unwrap(), b"other");

        assert_eq!(library.locate(id).unwrap(), recorded);
        library.delete_song(id).await.unwrap();
        assert!(stranger.exists());
    }
}
