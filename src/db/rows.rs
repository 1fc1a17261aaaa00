//! Row types and write statements for the catalog tables.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::model::{Album, AlbumId, Song, SongId};

/// Database row for the songs table.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct SongRow {
    id: String,
    file_name: String,
    folder: Option<String>,
    content_hash: String,
    imported_at: String,
    size: i64,
    title: String,
    artist: String,
    duration: f64,
    lyrics: Option<String>,
    description: Option<String>,
    album: Option<String>,
    album_artist: Option<String>,
    genre: Option<String>,
    track_number: Option<i64>,
    disc_number: Option<i64>,
    year: Option<i64>,
    composer: Option<String>,
    artwork_path: Option<String>,
    album_id: Option<String>,
}

/// Database row for the albums table.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct AlbumRow {
    id: String,
    name: String,
    artist: Option<String>,
    year: Option<i64>,
    artwork_path: Option<String>,
    created_at: String,
}

impl TryFrom<SongRow> for Song {
    type Error = uuid::Error;

    fn try_from(row: SongRow) -> Result<Self, Self::Error> {
        Ok(Song {
            id: row.id.parse::<SongId>()?,
            file_name: row.file_name,
            folder: row.folder,
            content_hash: row.content_hash,
            imported_at: parse_timestamp(&row.imported_at),
            size: u64::try_from(row.size).unwrap_or(0),
            title: row.title,
            artist: row.artist,
            duration: row.duration.max(0.0),
            lyrics: row.lyrics,
            description: row.description,
            album: row.album,
            album_artist: row.album_artist,
            genre: row.genre,
            track_number: row.track_number.and_then(|n| u32::try_from(n).ok()),
            disc_number: row.disc_number.and_then(|n| u32::try_from(n).ok()),
            year: row.year.and_then(|y| i32::try_from(y).ok()),
            composer: row.composer,
            artwork_path: row.artwork_path.map(PathBuf::from),
            // A malformed album id is treated as "no album"; reconciliation relinks it
            album_id: row.album_id.and_then(|id| id.parse::<AlbumId>().ok()),
        })
    }
}

impl TryFrom<AlbumRow> for Album {
    type Error = uuid::Error;

    fn try_from(row: AlbumRow) -> Result<Self, Self::Error> {
        Ok(Album {
            id: row.id.parse::<AlbumId>()?,
            name: row.name,
            artist: row.artist,
            year: row.year.and_then(|y| i32::try_from(y).ok()),
            artwork_path: row.artwork_path.map(PathBuf::from),
            created_at: parse_timestamp(&row.created_at),
            songs: BTreeSet::new(),
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn path_text(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

/// Insert or update a song record.
pub(super) async fn save_song(tx: &mut Transaction<'_, Sqlite>, song: &Song) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (
            id, file_name, folder, content_hash, imported_at, size, title, artist,
            duration, lyrics, description, album, album_artist, genre,
            track_number, disc_number, year, composer, artwork_path, album_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            file_name = excluded.file_name,
            folder = excluded.folder,
            content_hash = excluded.content_hash,
            imported_at = excluded.imported_at,
            size = excluded.size,
            title = excluded.title,
            artist = excluded.artist,
            duration = excluded.duration,
            lyrics = excluded.lyrics,
            description = excluded.description,
            album = excluded.album,
            album_artist = excluded.album_artist,
            genre = excluded.genre,
            track_number = excluded.track_number,
            disc_number = excluded.disc_number,
            year = excluded.year,
            composer = excluded.composer,
            artwork_path = excluded.artwork_path,
            album_id = excluded.album_id
        "#,
    )
    .bind(song.id.to_string())
    .bind(&song.file_name)
    .bind(&song.folder)
    .bind(&song.content_hash)
    .bind(song.imported_at.to_rfc3339())
    .bind(i64::try_from(song.size).unwrap_or(i64::MAX))
    .bind(&song.title)
    .bind(&song.artist)
    .bind(song.duration)
    .bind(&song.lyrics)
    .bind(&song.description)
    .bind(&song.album)
    .bind(&song.album_artist)
    .bind(&song.genre)
    .bind(song.track_number.map(i64::from))
    .bind(song.disc_number.map(i64::from))
    .bind(song.year.map(i64::from))
    .bind(&song.composer)
    .bind(path_text(&song.artwork_path))
    .bind(song.album_id.map(|id| id.to_string()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert or update an album record.
pub(super) async fn save_album(
    tx: &mut Transaction<'_, Sqlite>,
    album: &Album,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO albums (id, name, artist, year, artwork_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            artist = excluded.artist,
            year = excluded.year,
            artwork_path = excluded.artwork_path
        "#,
    )
    .bind(album.id.to_string())
    .bind(&album.name)
    .bind(&album.artist)
    .bind(album.year.map(i64::from))
    .bind(path_text(&album.artwork_path))
    .bind(album.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
