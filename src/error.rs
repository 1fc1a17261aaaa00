//! Error type shared by the catalog, importer and synchronizer.
//!
//! Library modules return [`Error`] through the [`Result`] alias, while the
//! CLI and `main` use `anyhow` for convenient propagation.
//!
//! Most of the core never lets these escape past a single item: the importer
//! folds them into a failed outcome, a failed flush is logged and retried on
//! the next one, and metadata problems degrade to defaults.

use std::path::PathBuf;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything the core can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Metadata reading error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// File or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record would break a catalog uniqueness rule
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Import of a single file failed
    #[error("Import error for {path}: {message}")]
    Import { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Offloaded blocking work panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Another error annotated with what was being attempted
    #[error("{during}: {source}")]
    During {
        during: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn import(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Import {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap this error with a description of the step that failed.
    pub fn context(self, during: impl Into<String>) -> Self {
        Self::During {
            during: during.into(),
            source: Box::new(self),
        }
    }
}

/// Attach a step description to a failing result.
pub trait ResultExt<T> {
    fn with_context(self, during: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context(self, during: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(during))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_not_found_names_the_record() {
        let err = Error::not_found("song 42");
        assert_eq!(err.to_string(), "Not found: song 42");
    }

    #[test]
    fn test_context_wraps_source() {
        let err = Error::import("/incoming/a.mp3", "disk full").context("importing batch");
        assert!(matches!(err, Error::During { .. }));
        let msg = err.to_string();
        assert!(msg.starts_with("importing batch: "));
        assert!(msg.contains("/incoming/a.mp3"));
    }

    #[test]
    fn test_metadata_error_mentions_path() {
        let err = Error::metadata("/library/track.flac", "no audio stream");
        assert_eq!(
            err.to_string(),
            "Metadata error for /library/track.flac: no audio stream"
        );
    }

    #[test]
    fn test_with_context_converts_io_errors() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = result.with_context("reading source").unwrap_err();
        match err {
            Error::During { during, source } => {
                assert_eq!(during, "reading source");
                assert!(matches!(*source, Error::Io(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
