//! Scoped access to import sources.
//!
//! Some platforms only allow reading a user-picked file between an explicit
//! "start access" and "stop access" call. The importer acquires an
//! [`AccessGuard`] before touching a source and drops it when done, so the
//! release runs on every exit path, including early returns on failure.

use std::fmt;
use std::io;
use std::path::Path;

/// Grants temporary read access to an external source file.
pub trait SourceAccess: Send + Sync {
    /// Acquire access to `source`. The returned guard releases it on drop.
    fn acquire(&self, source: &Path) -> io::Result<AccessGuard>;
}

/// Releases scoped access when dropped.
#[must_use = "access is released as soon as the guard is dropped"]
pub struct AccessGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl AccessGuard {
    /// A guard whose drop runs `release`.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A guard with nothing to release.
    pub fn unrestricted() -> Self {
        Self { release: None }
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("scoped", &self.release.is_some())
            .finish()
    }
}

/// Plain file system access: every readable path is fair game.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl SourceAccess for Unrestricted {
    fn acquire(&self, _source: &Path) -> io::Result<AccessGuard> {
        Ok(AccessGuard::unrestricted())
    }
}
