//! Data-directory resolution
//!
//! All durable state (store root, manifests, snapshot) lives under one
//! process-owned directory, `~/.code-context` by default.

use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".code-context";

/// Resolve the process data directory.
///
/// Falls back to the current directory when no home directory is known
/// (containers, stripped environments).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Expand a user-supplied URI (`~` and `$VAR`) into a filesystem path.
pub fn expand_uri(uri: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(uri).into_owned())
}

/// Default root for the on-disk vector store.
pub fn default_store_root() -> PathBuf {
    data_dir().join("store")
}

/// Directory holding per-codebase manifests.
pub fn manifests_dir() -> PathBuf {
    data_dir().join("manifests")
}

/// Well-known location of the process snapshot file.
pub fn snapshot_file() -> PathBuf {
    data_dir().join("index-snapshot.json")
}

/// Stable filesystem-name-safe key for a codebase path.
pub fn codebase_key(path: &std::path::Path) -> String {
    format!("{:016x}", seahash::hash(path.to_string_lossy().as_bytes()))
}

/// Collection name owned by a codebase.
pub fn collection_name(path: &std::path::Path) -> String {
    format!("code_chunks_{}", codebase_key(path))
}

/// Manifest location owned by a codebase.
pub fn manifest_path(path: &std::path::Path) -> PathBuf {
    manifests_dir().join(format!("{}.json", codebase_key(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_uri("~/somewhere");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn plain_paths_pass_through() {
        assert_eq!(expand_uri("/tmp/store"), PathBuf::from("/tmp/store"));
    }

    #[test]
    fn codebase_keys_are_stable_and_name_safe() {
        let a = codebase_key(std::path::Path::new("/home/user/project"));
        let b = codebase_key(std::path::Path::new("/home/user/project"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        let other = codebase_key(std::path::Path::new("/home/user/other"));
        assert_ne!(a, other);
    }
}
