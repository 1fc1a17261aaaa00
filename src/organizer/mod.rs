//! Naming policy for files placed in the managed library.
//!
//! Imported files are named `"NN - Artist - Title.ext"` (or `"Artist - Title.ext"`
//! without a track number) and optionally grouped into one folder per album.
//! Names never collide with an existing file: [`unique_name`] appends ` (k)`.

use rand::Rng;
use std::path::{Path, PathBuf};

/// Extension used when the source file has none.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Give up on ` (k)` suffixes after this many collisions.
const MAX_NUMBERED_ATTEMPTS: u32 = 999;

/// Sanitizes a name component by replacing path-unsafe characters and trimming.
///
/// A leading dot is replaced as well: the scanner skips dot-directories and
/// `._` files, so an album folder named ".38 Special" would never be walked.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect();
    let trimmed = replaced.trim();
    match trimmed.strip_prefix('.') {
        Some(rest) => format!("_{rest}"),
        None => trimmed.to_string(),
    }
}

/// Build the library file name for a track.
///
/// Empty artist/title become "Unknown"/"Untitled"; a positive track number adds
/// a two-digit prefix; the extension is lower-cased and defaults to `mp3`.
pub fn file_name(
    artist: &str,
    title: &str,
    track_number: Option<u32>,
    extension: Option<&str>,
) -> String {
    let artist = non_empty_or(sanitize_component(artist), "Unknown");
    let title = non_empty_or(sanitize_component(title), "Untitled");
    let ext = extension
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    match track_number.filter(|n| *n > 0) {
        Some(n) => format!("{:02} - {} - {}.{}", n, artist, title, ext),
        None => format!("{} - {}.{}", artist, title, ext),
    }
}

/// Return `base` if it is free in `directory`, else the first free `"stem (k).ext"`.
///
/// After [`MAX_NUMBERED_ATTEMPTS`] collisions a short random token is used instead.
pub fn unique_name(base: &str, directory: &Path) -> String {
    if !directory.join(base).exists() {
        return base.to_string();
    }

    let (stem, ext) = split_extension(base);
    for k in 1..=MAX_NUMBERED_ATTEMPTS {
        let candidate = with_suffix(stem, ext, &k.to_string());
        if !directory.join(&candidate).exists() {
            return candidate;
        }
    }

    tracing::warn!(target: "organizer", base, directory = %directory.display(), "Numbered names exhausted, using random suffix");
    loop {
        let candidate = with_suffix(stem, ext, &random_token());
        if !directory.join(&candidate).exists() {
            return candidate;
        }
    }
}

/// Folder (relative to the managed root) that an album's files go into.
///
/// `None` means the root itself: grouping is off or the album name is empty.
pub fn album_folder(album: Option<&str>, group_by_album: bool) -> Option<String> {
    if !group_by_album {
        return None;
    }
    album
        .map(sanitize_component)
        .filter(|name| !name.is_empty() && name.chars().any(|c| c != '.' && c != '_'))
}

/// Absolute directory an album's files go into.
pub fn album_directory(root: &Path, album: Option<&str>, group_by_album: bool) -> PathBuf {
    match album_folder(album, group_by_album) {
        Some(folder) => root.join(folder),
        None => root.to_path_buf(),
    }
}

fn split_extension(base: &str) -> (&str, Option<&str>) {
    match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], Some(&base[idx + 1..])),
        _ => (base, None),
    }
}

fn with_suffix(stem: &str, ext: Option<&str>, suffix: &str) -> String {
    match ext {
        Some(ext) => format!("{} ({}).{}", stem, suffix, ext),
        None => format!("{} ({})", stem, suffix),
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
