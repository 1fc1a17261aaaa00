//! Import pipeline: one external or discovered file into the catalog.
//!
//! Steps, in order: hash → dedup check → extract metadata → place the file
//! (copy mode only) → cache artwork → insert the song → attach it to its album.
//!
//! Blocking work (hashing, copying, artwork writes, tag parsing) runs on the
//! blocking pool; only the catalog mutation happens on the calling task.
//! Any failure aborts the single file and is reported as
//! [`ImportOutcome::Failed`]; batch callers keep going.

pub mod access;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::album;
use crate::cover::ArtworkCache;
use crate::db::Catalog;
use crate::error::{Error, Result, ResultExt};
use crate::hash::hash_file;
use crate::metadata::{MetadataExtractor, extract_async};
use crate::model::{Song, SongId};
use crate::organizer;
pub use access::{AccessGuard, SourceAccess, Unrestricted};

/// How a file enters the managed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// External source: copied into the tree under a generated name
    Copy,
    /// Already inside the tree: cataloged where it is, never renamed or moved
    AdoptInPlace,
}

/// Result of importing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(SongId),
    /// Byte-identical content is already cataloged
    Duplicate { existing: SongId },
    Failed(String),
}

/// Aggregate result of a batch import.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// One line per failed file
    pub errors: Vec<String>,
    /// Songs created by this batch, in import order
    pub songs: Vec<SongId>,
}

impl ImportSummary {
    pub fn record(&mut self, source: &Path, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Imported(id) => {
                self.imported += 1;
                self.songs.push(*id);
            }
            ImportOutcome::Duplicate { .. } => self.duplicates += 1,
            ImportOutcome::Failed(reason) => {
                self.failed += 1;
                self.errors.push(format!("{}: {}", source.display(), reason));
            }
        }
    }

    /// User-facing error text, only when the whole batch failed.
    ///
    /// Duplicates are not errors, so a batch of nothing but duplicates is silent.
    pub fn error_message(&self) -> Option<String> {
        if self.imported > 0 || self.failed == 0 {
            return None;
        }
        let mut message = format!(
            "No files were imported ({} of {} failed)",
            self.failed,
            self.failed + self.duplicates
        );
        if let Some(first) = self.errors.first() {
            message.push_str(": ");
            message.push_str(first);
        }
        Some(message)
    }
}

/// Everything an import needs besides the catalog.
pub struct ImportContext<'a> {
    /// Managed root directory
    pub root: &'a Path,
    pub artwork: &'a ArtworkCache,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub access: &'a dyn SourceAccess,
    /// Settings flag, read once per batch
    pub group_by_album: bool,
}

/// Import one file. Never fails; problems become [`ImportOutcome::Failed`].
pub async fn import_file(
    ctx: &ImportContext<'_>,
    catalog: &mut Catalog,
    source: &Path,
    mode: ImportMode,
) -> ImportOutcome {
    match try_import(ctx, catalog, source, mode).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(target: "importer", source = %source.display(), error = %e, "Import failed");
            ImportOutcome::Failed(e.to_string())
        }
    }
}

/// Import each source independently, in order.
pub async fn import_batch(
    ctx: &ImportContext<'_>,
    catalog: &mut Catalog,
    sources: &[PathBuf],
    mode: ImportMode,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for source in sources {
        let outcome = import_file(ctx, catalog, source, mode).await;
        summary.record(source, &outcome);
    }
    summary
}

async fn try_import(
    ctx: &ImportContext<'_>,
    catalog: &mut Catalog,
    source: &Path,
    mode: ImportMode,
) -> Result<ImportOutcome> {
    // Held until the end of this function, whatever the outcome
    let _access = match mode {
        ImportMode::Copy => ctx
            .access
            .acquire(source)
            .with_context(format!("acquiring access to {}", source.display()))?,
        ImportMode::AdoptInPlace => AccessGuard::unrestricted(),
    };

    let path = source.to_path_buf();
    let (content_hash, size) = tokio::task::spawn_blocking(move || -> std::io::Result<_> {
        let size = fs::metadata(&path)?.len();
        Ok((hash_file(&path)?, size))
    })
    .await?
    .with_context(format!("reading {}", source.display()))?;

    if let Some(existing) = catalog.find_song_by_hash(&content_hash) {
        tracing::debug!(
            target: "importer",
            source = %source.display(),
            existing = %existing.id,
            "Skipping duplicate content"
        );
        return Ok(ImportOutcome::Duplicate {
            existing: existing.id,
        });
    }

    let mut meta = extract_async(Arc::clone(&ctx.extractor), source.to_path_buf()).await;

    let (folder, file_name) = match mode {
        ImportMode::Copy => {
            let folder = organizer::album_folder(meta.album.as_deref(), ctx.group_by_album);
            let base = organizer::file_name(
                &meta.artist,
                &meta.title,
                meta.track_number,
                source.extension().and_then(|e| e.to_str()),
            );
            let dest_dir = match &folder {
                Some(f) => ctx.root.join(f),
                None => ctx.root.to_path_buf(),
            };
            let src = source.to_path_buf();
            let name = tokio::task::spawn_blocking(move || place_copy(&src, &dest_dir, &base)).await??;
            (folder, name)
        }
        ImportMode::AdoptInPlace => adopted_location(ctx.root, source)?,
    };

    let artwork_path = match meta.artwork.take() {
        Some(bytes) => {
            let cache = ctx.artwork.clone();
            match tokio::task::spawn_blocking(move || cache.store(&bytes)).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(target: "importer", error = %e, "Artwork task failed");
                    None
                }
            }
        }
        None => None,
    };

    let song = Song {
        id: SongId::new(),
        file_name,
        folder,
        content_hash,
        imported_at: Utc::now(),
        size,
        title: meta.title,
        artist: meta.artist,
        duration: meta.duration.max(0.0),
        lyrics: meta.lyrics,
        description: meta.description,
        album: meta.album,
        album_artist: meta.album_artist,
        genre: meta.genre,
        track_number: meta.track_number,
        disc_number: meta.disc_number,
        year: meta.year,
        composer: meta.composer,
        artwork_path,
        album_id: None,
    };
    let placed = ctx.root.join(song.relative_path());

    let song_id = match catalog.insert_song(song) {
        Ok(id) => id,
        Err(e) => {
            if mode == ImportMode::Copy
                && let Err(remove_err) = fs::remove_file(&placed)
            {
                tracing::warn!(target: "importer", path = %placed.display(), error = %remove_err, "Failed to remove copied file");
            }
            return Err(e);
        }
    };
    album::attach(catalog, song_id);

    tracing::info!(
        target: "importer",
        source = %source.display(),
        dest = %placed.display(),
        song = %song_id,
        "Imported"
    );
    Ok(ImportOutcome::Imported(song_id))
}

/// Copy `src` into `dest_dir` under a free variant of `base`.
fn place_copy(src: &Path, dest_dir: &Path, base: &str) -> Result<String> {
    fs::create_dir_all(dest_dir).with_context(format!("creating {}", dest_dir.display()))?;
    let name = organizer::unique_name(base, dest_dir);
    let dest = dest_dir.join(&name);
    fs::copy(src, &dest).with_context(format!("copying to {}", dest.display()))?;
    Ok(name)
}

/// Split a path inside the managed root into (sub-folder, file name).
fn adopted_location(root: &Path, path: &Path) -> Result<(Option<String>, String)> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::import(path, "not inside the library root"))?;
    let file_name = relative
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::import(path, "file name is not valid UTF-8"))?
        .to_string();
    let folder = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Some(
            parent
                .to_str()
                .ok_or_else(|| Error::import(path, "folder name is not valid UTF-8"))?
                .to_string(),
        ),
        _ => None,
    };
    Ok((folder, file_name))
}
