//! Album reconciliation.
//!
//! Albums are a secondary index derived from song metadata. Every path that
//! links a song to an album (import, and the self-healing pass after a
//! synchronization) goes through [`get_or_create`], so duplicate detection
//! lives in exactly one place: the catalog's (name, artist) key.

use std::collections::HashSet;

use serde::Serialize;

use crate::db::Catalog;
use crate::model::{Album, AlbumId, Song, SongId};

/// Summary of a reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Songs whose album link was (re)established
    pub linked: usize,
    /// Albums created along the way
    pub created: usize,
    /// Albums that received artwork from a member
    pub artwork_backfilled: usize,
    /// Empty albums removed
    pub removed: usize,
}

/// Find or create the album a song belongs to.
///
/// The album key is the song's album name plus its album-artist (falling back
/// to the track artist). Returns `None` when the song has no album name. An
/// existing album without artwork inherits the song's artwork path.
pub fn get_or_create(catalog: &mut Catalog, song: &Song) -> Option<(AlbumId, bool)> {
    let name = song.album.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    let artist = song.album_grouping_artist();

    if let Some(existing) = catalog.find_album(name, artist) {
        let id = existing.id;
        if existing.artwork_path.is_none() && song.artwork_path.is_some() {
            catalog.set_album_artwork(id, song.artwork_path.clone());
        }
        return Some((id, false));
    }

    let album = Album::new(name, artist, song.year, song.artwork_path.clone());
    match catalog.insert_album(album) {
        Ok(id) => {
            tracing::debug!(target: "album", album = name, artist = ?artist, "Created album");
            Some((id, true))
        }
        Err(e) => {
            tracing::warn!(target: "album", album = name, error = %e, "Failed to create album");
            None
        }
    }
}

/// Link a cataloged song to its album, creating the album if needed.
///
/// Returns the album id, or `None` if the song has no album name.
pub fn attach(catalog: &mut Catalog, song_id: SongId) -> Option<AlbumId> {
    let song = catalog.song(song_id)?.clone();
    let (album_id, _) = get_or_create(catalog, &song)?;
    if let Err(e) = catalog.link_song_to_album(song_id, album_id) {
        tracing::warn!(target: "album", song = %song_id, error = %e, "Failed to link song to album");
        return None;
    }
    Some(album_id)
}

/// Repair album membership across the whole catalog.
///
/// Links every song that has album metadata but no (valid) album link,
/// backfills missing album artwork from members, and drops albums that
/// have no members.
pub fn reconcile(catalog: &mut Catalog) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let unlinked: Vec<SongId> = catalog
        .songs()
        .into_iter()
        .filter(|song| song.album.as_deref().is_some_and(|a| !a.trim().is_empty()))
        .filter(|song| match song.album_id {
            None => true,
            Some(album_id) => !catalog
                .album(album_id)
                .is_some_and(|album| album.songs.contains(&song.id)),
        })
        .map(|song| song.id)
        .collect();

    let albums_before: HashSet<AlbumId> = catalog.albums().iter().map(|a| a.id).collect();
    for song_id in unlinked {
        if attach(catalog, song_id).is_some() {
            report.linked += 1;
        }
    }
    report.created = catalog
        .albums()
        .iter()
        .filter(|a| !albums_before.contains(&a.id))
        .count();

    let needs_artwork: Vec<(AlbumId, Option<std::path::PathBuf>)> = catalog
        .albums()
        .into_iter()
        .filter(|album| album.artwork_path.is_none())
        .map(|album| {
            let artwork = album
                .songs
                .iter()
                .filter_map(|id| catalog.song(*id))
                .find_map(|song| song.artwork_path.clone());
            (album.id, artwork)
        })
        .filter(|(_, artwork)| artwork.is_some())
        .collect();
    for (album_id, artwork) in needs_artwork {
        if catalog.set_album_artwork(album_id, artwork) {
            report.artwork_backfilled += 1;
        }
    }

    let empty: Vec<AlbumId> = catalog
        .albums()
        .iter()
        .filter(|a| a.songs.is_empty())
        .map(|a| a.id)
        .collect();
    for album_id in empty {
        if catalog.delete_album(album_id).is_some() {
            report.removed += 1;
        }
    }

    if report != ReconcileReport::default() {
        tracing::info!(
            target: "album",
            linked = report.linked,
            created = report.created,
            artwork = report.artwork_backfilled,
            removed = report.removed,
            "Albums reconciled"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_song, temp_catalog};
    use std::path::PathBuf;

    fn song_on_album(file: &str, hash: &str, album: &str, album_artist: Option<&str>) -> Song {
        let mut song = mock_song(file, hash);
        song.album = Some(album.to_string());
        song.album_artist = album_artist.map(str::to_string);
        song
    }

    #[tokio::test]
    async fn test_attach_without_album_name() {
        let (mut catalog, _dir) = temp_catalog().await;
        let id = catalog.insert_song(mock_song("a.mp3", "ha")).unwrap();
        assert_eq!(attach(&mut catalog, id), None);
        assert_eq!(catalog.album_count(), 0);

        let mut blank = mock_song("b.mp3", "hb");
        blank.album = Some("   ".to_string());
        let id = catalog.insert_song(blank).unwrap();
        assert_eq!(attach(&mut catalog, id), None);
    }

    #[tokio::test]
    async fn test_attach_reuses_album_for_same_key() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = catalog.insert_song(song_on_album("a.mp3", "ha", "Album", None)).unwrap();
        let b = catalog.insert_song(song_on_album("b.mp3", "hb", "Album", None)).unwrap();

        let first = attach(&mut catalog, a).unwrap();
        let second = attach(&mut catalog, b).unwrap();
        assert_eq!(first, second);
        assert_eq!(catalog.album(first).unwrap().song_count(), 2);
        assert_eq!(catalog.song(a).unwrap().album_id, Some(first));
    }

    #[tokio::test]
    async fn test_different_album_artists_make_distinct_albums() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = catalog
            .insert_song(song_on_album("a.mp3", "ha", "Greatest Hits", Some("Queen")))
            .unwrap();
        let b = catalog
            .insert_song(song_on_album("b.mp3", "hb", "Greatest Hits", Some("ABBA")))
            .unwrap();

        assert_ne!(attach(&mut catalog, a), attach(&mut catalog, b));
        assert_eq!(catalog.album_count(), 2);
    }

    #[tokio::test]
    async fn test_attach_twice_counts_once() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = catalog.insert_song(song_on_album("a.mp3", "ha", "Album", None)).unwrap();
        let album = attach(&mut catalog, a).unwrap();
        attach(&mut catalog, a).unwrap();
        assert_eq!(catalog.album(album).unwrap().song_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_album_inherits_artwork() {
        let (mut catalog, _dir) = temp_catalog().await;
        let a = catalog.insert_song(song_on_album("a.mp3", "ha", "Album", None)).unwrap();
        let album = attach(&mut catalog, a).unwrap();
        assert!(catalog.album(album).unwrap().artwork_path.is_none());

        let mut with_art = song_on_album("b.mp3", "hb", "Album", None);
        with_art.artwork_path = Some(PathBuf::from("/cache/cover.jpg"));
        let b = catalog.insert_song(with_art).unwrap();
        attach(&mut catalog, b).unwrap();

        assert_eq!(
            catalog.album(album).unwrap().artwork_path,
            Some(PathBuf::from("/cache/cover.jpg"))
        );
    }

    #[tokio::test]
    async fn test_reconcile_links_orphaned_songs() {
        let (mut catalog, _dir) = temp_catalog().await;
        catalog.insert_song(song_on_album("a.mp3", "ha", "Album", None)).unwrap();
        catalog.insert_song(song_on_album("b.mp3", "hb", "Album", None)).unwrap();
        catalog.insert_song(mock_song("c.mp3", "hc")).unwrap();

        let report = reconcile(&mut catalog);
        assert_eq!(report.linked, 2);
        assert_eq!(report.created, 1);
        assert_eq!(catalog.album_count(), 1);
        assert_eq!(catalog.albums()[0].song_count(), 2);

        // Second pass has nothing to do
        assert_eq!(reconcile(&mut catalog), ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_reconcile_removes_empty_albums_and_backfills_artwork() {
        let (mut catalog, _dir) = temp_catalog().await;
        catalog
            .insert_album(Album::new("Empty", Some("Nobody"), None, None))
            .unwrap();
        let mut song = song_on_album("a.mp3", "ha", "Album", None);
        song.artwork_path = Some(PathBuf::from("/cache/a.jpg"));
        let id = catalog.insert_song(song).unwrap();
        let album = attach(&mut catalog, id).unwrap();
        catalog.set_album_artwork(album, None);

        let report = reconcile(&mut catalog);
        assert_eq!(report.removed, 1);
        assert_eq!(report.artwork_backfilled, 1);
        assert!(catalog.find_album("Empty", Some("Nobody")).is_none());
        assert_eq!(
            catalog.album(album).unwrap().artwork_path,
            Some(PathBuf::from("/cache/a.jpg"))
        );
    }
}
