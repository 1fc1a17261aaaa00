//! Cover artwork caching.
//!
//! Artwork embedded in imported files is stored once per distinct image in a
//! hidden, content-addressed directory inside the managed root. Songs (and
//! albums) only ever hold the path of the cached file.

mod cache;

pub use cache::ArtworkCache;

/// Name of the hidden cache directory under the managed root.
pub const ARTWORK_DIR: &str = ".artwork";
