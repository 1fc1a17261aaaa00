//! Content fingerprints for deduplication.
//!
//! Songs and cached artwork are both identified by the SHA-256 digest of
//! their full byte content, rendered as lowercase hex. File names and tags
//! play no part, so a renamed or re-tagged copy of the same bytes hashes
//! identically.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for streaming file hashes (64KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// Hash an in-memory buffer.
///
/// # Returns
///
/// SHA256 hash as a lowercase hex string (64 characters)
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

/// Hash the full content of a file without loading it into memory.
///
/// Produces the same digest as [`hash_bytes`] over the file's bytes.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
