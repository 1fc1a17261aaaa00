//! Out-of-band change watcher for the managed root.
//!
//! Files dragged into the library folder by an external file manager (or
//! deleted from it) are picked up here and turned into a synchronization
//! trigger. The watcher only reports *that* something changed; the
//! synchronizer works out *what* changed by comparing the tree with the
//! catalog.
//!
//! # Design
//!
//! - **Debounced events**: a burst of file operations coalesces into a few events
//! - **Audio files only**: filters on the scanner's extension allow-list
//! - **Hidden entries ignored**: artwork cache writes never trigger a pass
//! - **Non-blocking**: events arrive on a bounded channel; overflow is dropped
//!
//! # Usage
//!
//! ```rust,ignore
//! let (watcher, rx) = FileWatcher::new(&root)?;
//! while let Some(burst) = next_burst(&rx, Duration::from_millis(250)) {
//!     if burst.iter().any(WatchEvent::affects_library) {
//!         library.trigger_sync().await;
//!     }
//! }
//! drop(watcher);
//! ```

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use notify::{
    EventKind, RecommendedWatcher, RecursiveMode,
    event::{CreateKind, ModifyKind, RemoveKind},
};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{is_audio_file, is_excluded_name};

/// Debounce window for file system events.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A new audio file appeared
    Created(PathBuf),
    /// An existing audio file was rewritten
    Modified(PathBuf),
    /// An audio file was removed
    Removed(PathBuf),
    /// An entry was renamed or moved (either side may be outside the root)
    Renamed(PathBuf),
    /// A directory was created (may already contain audio files)
    DirCreated(PathBuf),
    /// The watcher reported an error
    Error(String),
}

impl WatchEvent {
    /// Whether this event can change what a synchronization pass would find.
    pub fn affects_library(&self) -> bool {
        !matches!(self, WatchEvent::Error(_))
    }
}

/// Handle to a running file watcher.
///
/// Dropping this handle stops the watcher.
pub struct FileWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    root: PathBuf,
    running: Arc<AtomicBool>,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns the watcher handle and a receiver for watch events.
    pub fn new(root: &Path) -> Result<(Self, Receiver<WatchEvent>), WatchError> {
        let (tx, rx) = bounded(256);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let filter_root = root.to_path_buf();

        let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            if !running_clone.load(Ordering::Relaxed) {
                return;
            }
            handle_debounced_events(result, &filter_root, &tx);
        })
        .map_err(|e| WatchError::Init(e.to_string()))?;

        debouncer
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch(e.to_string()))?;
        tracing::info!(target: "scanner::watcher", path = %root.display(), "Watching library root");

        Ok((
            Self {
                debouncer,
                root: root.to_path_buf(),
                running,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Err(e) = self.debouncer.unwatch(&self.root) {
            tracing::debug!(target: "scanner::watcher", error = %e, "Unwatch on shutdown failed");
        }
        tracing::debug!(target: "scanner::watcher", "File watcher stopped");
    }
}

/// Block for the next event, then drain whatever else arrives within `settle`.
///
/// Returns `None` once the watcher is gone.
pub fn next_burst(rx: &Receiver<WatchEvent>, settle: Duration) -> Option<Vec<WatchEvent>> {
    let first = rx.recv().ok()?;
    let mut burst = vec![first];
    loop {
        match rx.recv_timeout(settle) {
            Ok(event) => burst.push(event),
            Err(RecvTimeoutError::Timeout) => return Some(burst),
            Err(RecvTimeoutError::Disconnected) => return Some(burst),
        }
    }
}

fn handle_debounced_events(result: DebounceEventResult, root: &Path, tx: &Sender<WatchEvent>) {
    match result {
        Ok(events) => {
            for event in events {
                for path in &event.paths {
                    if let Some(watch_event) = classify(&event.kind, path, root) {
                        tracing::debug!(target: "scanner::watcher", event = ?watch_event, "Library change");
                        // Full channel: the pending events already force a pass
                        let _ = tx.try_send(watch_event);
                    }
                }
            }
        }
        Err(errors) => {
            for error in errors {
                tracing::warn!(target: "scanner::watcher", error = %error, "Watch error");
                let _ = tx.try_send(WatchEvent::Error(error.to_string()));
            }
        }
    }
}

fn classify(kind: &EventKind, path: &Path, root: &Path) -> Option<WatchEvent> {
    if is_hidden_within(path, root) {
        return None;
    }

    let path_buf = path.to_path_buf();
    match kind {
        EventKind::Create(CreateKind::Folder) => Some(WatchEvent::DirCreated(path_buf)),
        EventKind::Create(_) if is_audio_file(path) => Some(WatchEvent::Created(path_buf)),
        EventKind::Modify(ModifyKind::Name(_)) if is_audio_file(path) || path.is_dir() => {
            Some(WatchEvent::Renamed(path_buf))
        }
        EventKind::Modify(ModifyKind::Data(_)) if is_audio_file(path) => {
            Some(WatchEvent::Modified(path_buf))
        }
        // A removed path can no longer be stat'ed, so directories show up as
        // extension-less removals
        EventKind::Remove(RemoveKind::Folder) => Some(WatchEvent::Removed(path_buf)),
        EventKind::Remove(_) if is_audio_file(path) || path.extension().is_none() => {
            Some(WatchEvent::Removed(path_buf))
        }
        _ => None,
    }
}

/// True when `path` lies in a dot-directory below `root` or is itself an
/// excluded name.
///
/// The path may already be gone, so a dot-named leaf counts as a directory
/// unless it has an audio extension.
fn is_hidden_within(path: &Path, root: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let names: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    let Some((leaf, parents)) = names.split_last() else {
        return false;
    };
    parents.iter().any(|name| is_excluded_name(name, true))
        || is_excluded_name(leaf, !is_audio_file(path))
}

/// Errors that can occur during file watching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {0}")]
    Init(String),
    #[error("Failed to watch path: {0}")]
    Watch(String),
}
