//! Managed-tree traversal.
//!
//! The walk runs on the blocking pool and feeds paths through a channel, so
//! callers can consume it as a `Stream` or collect it in one go.

pub mod watcher;

use futures::stream::Stream;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::{DirEntry, WalkDir};

/// File extensions (lower-case) eligible for adoption.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "wav", "ogg", "opus", "aiff", "wma", "alac", "m4b",
];

/// Check whether a path has an allow-listed audio extension (case-insensitive).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Entry names that are never part of the library.
///
/// Dot-directories (the artwork cache among them) are skipped whole. Files are
/// skipped only when they carry the `._` resource-fork prefix, so a plain
/// dot-file such as `.intro.mp3` is still adopted.
pub(crate) fn is_excluded_name(name: &str, is_dir: bool) -> bool {
    if is_dir {
        name.starts_with('.')
    } else {
        name.starts_with("._")
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| is_excluded_name(name, entry.file_type().is_dir()))
}

/// Scans the given root directory recursively for audio files.
///
/// Returns a Stream of absolute paths. Unreadable entries are skipped.
pub fn scan(root: PathBuf) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    tokio::task::spawn_blocking(move || {
        for path in walk(&root) {
            // Receiver dropped: stop walking
            if tx.blocking_send(path).is_err() {
                break;
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

/// Synchronous walk, for callers already on the blocking pool.
pub fn walk(root: &Path) -> impl Iterator<Item = PathBuf> + use<> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(target: "scanner", error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
        .map(DirEntry::into_path)
}
