//! File content hashing
//!
//! Fixed-width SHA-256 hashes over file bytes drive the manifest's change
//! detection; modification times alone are not trusted.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Hash a file's contents, streaming in 8 KiB blocks.
///
/// Returns `None` when the file cannot be read; the caller treats such
/// files as removed for the current cycle.
pub fn hash_file(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer).ok()?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Some(format!("{:x}", hasher.finalize()))
}

/// Hash a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
