//! Library synchronization: converge the catalog with the managed tree.
//!
//! A pass runs these steps in order:
//!
//! 1. Load settings (the grouping flag).
//! 2. Snapshot the cataloged songs.
//! 3. Drop songs whose file is gone. Existence checks run in parallel on the
//!    blocking pool. A song whose recorded file is missing follows it to the
//!    settings-derived location only when that file has the song's content.
//!    Orphans go first so a removed file cannot shadow a new one at the same
//!    location.
//! 4. Walk the managed root for audio files.
//! 5. Adopt every file not at a known location. Dedup keys on content hash,
//!    so a renamed or moved copy of cataloged content is skipped.
//! 6. Flush the catalog once.
//! 7. Repair artwork paths and reconcile albums, then flush what that changed.
//!
//! Passes never overlap: [`SyncGate`] hands out at most one [`SyncPermit`],
//! and a trigger that finds the gate closed is dropped rather than queued.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{Library, resolve_location};
use crate::album::{self, ReconcileReport};
use crate::error::Result;
use crate::importer::{self, ImportContext, ImportMode, ImportOutcome};
use crate::model::{Song, SongId, SyncStatus};
use crate::scanner;

/// Admits one synchronization pass at a time.
#[derive(Debug, Clone, Default)]
pub struct SyncGate {
    running: Arc<AtomicBool>,
}

impl SyncGate {
    /// Take the gate, or `None` if a pass is already running.
    pub fn try_acquire(&self) -> Option<SyncPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of holding the gate; reopens it on drop.
#[derive(Debug)]
pub struct SyncPermit {
    running: Arc<AtomicBool>,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// What one pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Songs dropped because their file was gone
    pub removed: usize,
    /// Files adopted into the catalog
    pub adopted: usize,
    /// Files skipped because their content is already cataloged
    pub duplicates: usize,
    /// Files that could not be adopted
    pub failed: usize,
    /// Songs whose recorded folder was updated to where the file was found
    pub relocated: usize,
    /// Songs whose artwork path was restored or cleared
    pub artwork_repaired: usize,
    pub albums: ReconcileReport,
    /// Whether every flush of the pass succeeded
    pub persisted: bool,
    pub errors: Vec<String>,
}

/// Run a pass on a shared library unless one is already running.
///
/// The gate is checked before waiting for the lock, so triggers that pile up
/// while a pass runs are dropped instead of running back to back.
pub async fn trigger_sync(library: &Mutex<Library>, gate: &SyncGate) -> Option<SyncReport> {
    let Some(_permit) = gate.try_acquire() else {
        tracing::debug!(target: "library::sync", "Synchronization already running, trigger ignored");
        return None;
    };
    let mut library = library.lock().await;
    Some(library.run_pass().await)
}

impl Library {
    /// Run one synchronization pass.
    ///
    /// Returns `None` without doing anything if another pass holds the gate.
    pub async fn synchronize(&mut self) -> Option<SyncReport> {
        let Some(_permit) = self.gate.try_acquire() else {
            tracing::debug!(target: "library::sync", "Synchronization already running, trigger ignored");
            return None;
        };
        Some(self.run_pass().await)
    }

    pub(super) async fn run_pass(&mut self) -> SyncReport {
        let mut report = SyncReport {
            persisted: true,
            ..SyncReport::default()
        };

        if let Err(e) = self.pass(&mut report).await {
            tracing::error!(target: "library::sync", error = %e, "Synchronization pass aborted");
            report.errors.push(e.to_string());
            report.persisted &= self.catalog.flush_best_effort().await;
        }

        self.set_status(SyncStatus::Complete);
        tracing::info!(
            target: "library::sync",
            removed = report.removed,
            adopted = report.adopted,
            duplicates = report.duplicates,
            failed = report.failed,
            persisted = report.persisted,
            "Synchronization complete"
        );
        report
    }

    async fn pass(&mut self, report: &mut SyncReport) -> Result<()> {
        self.set_status(SyncStatus::Scanning("Loading settings".into()));
        let group_by_album = self.catalog.settings().group_by_album;

        self.set_status(SyncStatus::Scanning("Checking cataloged files".into()));
        let songs: Vec<Song> = self.catalog.songs().into_iter().cloned().collect();
        let claimed = self.recorded_locations();
        let root = self.root.clone();
        let located: Vec<(SongId, Option<PathBuf>)> = tokio::task::spawn_blocking(move || {
            songs
                .par_iter()
                .map(|song| (song.id, resolve_location(&root, song, group_by_album, &claimed)))
                .collect()
        })
        .await?;

        for (id, found) in located {
            match found {
                None => {
                    if self.catalog.delete_song(id).is_some() {
                        tracing::info!(target: "library::sync", song = %id, "Removed song whose file is gone");
                        report.removed += 1;
                    }
                }
                Some(path) => {
                    if self.catalog.set_song_folder(id, folder_of(&self.root, &path)) {
                        report.relocated += 1;
                    }
                }
            }
        }

        self.set_status(SyncStatus::Scanning("Scanning library folder".into()));
        let mut discovered: Vec<PathBuf> = scanner::scan(self.root.clone()).collect().await;
        discovered.sort();

        let known: HashSet<PathBuf> = self
            .catalog
            .songs()
            .iter()
            .map(|song| self.root.join(song.relative_path()))
            .collect();
        let new_files: Vec<PathBuf> = discovered
            .into_iter()
            .filter(|path| !known.contains(path))
            .collect();

        let ctx = ImportContext {
            root: &self.root,
            artwork: &self.artwork,
            extractor: Arc::clone(&self.extractor),
            access: self.access.as_ref(),
            group_by_album,
        };
        for path in &new_files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.status
                .send_replace(SyncStatus::Scanning(format!("Importing {}", name)));
            match importer::import_file(&ctx, &mut self.catalog, path, ImportMode::AdoptInPlace).await {
                ImportOutcome::Imported(_) => report.adopted += 1,
                ImportOutcome::Duplicate { .. } => report.duplicates += 1,
                ImportOutcome::Failed(reason) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", path.display(), reason));
                }
            }
        }

        self.set_status(SyncStatus::Scanning("Saving catalog".into()));
        report.persisted &= self.catalog.flush_best_effort().await;

        self.set_status(SyncStatus::Scanning("Reconciling albums".into()));
        report.artwork_repaired = self.repair_artwork().await?;
        report.albums = album::reconcile(&mut self.catalog);
        if self.catalog.has_pending_changes() {
            report.persisted &= self.catalog.flush_best_effort().await;
        }
        Ok(())
    }

    /// Point every song and album at artwork that exists on disk.
    ///
    /// Songs whose cached image vanished get it re-extracted from their file;
    /// albums with a dangling path are cleared so reconciliation can backfill
    /// them from a member.
    async fn repair_artwork(&mut self) -> Result<usize> {
        let broken: Vec<_> = self
            .catalog
            .songs()
            .into_iter()
            .filter(|song| song.artwork_path.as_ref().is_some_and(|p| !p.exists()))
            .map(|song| (song.clone(), self.root.join(song.relative_path())))
            .collect();

        let mut repaired = 0;
        if !broken.is_empty() {
            let cache = self.artwork.clone();
            let extractor = Arc::clone(&self.extractor);
            let results: Vec<(SongId, Option<PathBuf>)> = tokio::task::spawn_blocking(move || {
                broken
                    .iter()
                    .map(|(song, source)| (song.id, cache.repair(song, source, extractor.as_ref())))
                    .collect()
            })
            .await?;

            for (id, artwork) in results {
                if self.catalog.set_song_artwork(id, artwork) {
                    repaired += 1;
                }
            }
        }

        let dangling_albums: Vec<_> = self
            .catalog
            .albums()
            .iter()
            .filter(|album| album.artwork_path.as_ref().is_some_and(|p| !p.exists()))
            .map(|album| album.id)
            .collect();
        for id in dangling_albums {
            self.catalog.set_album_artwork(id, None);
        }

        if repaired > 0 {
            tracing::info!(target: "library::sync", songs = repaired, "Artwork repaired");
        }
        Ok(repaired)
    }
}

/// Folder of `path` relative to `root`, `None` for files directly in the root.
fn folder_of(root: &Path, path: &Path) -> Option<String> {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .and_then(|rel| rel.to_str())
        .map(str::to_string)
}
