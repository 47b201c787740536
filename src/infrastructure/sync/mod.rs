//! File synchronization
//!
//! Keeps a per-codebase manifest (`relative path → {hash, mtime}`) durable
//! under the process data directory and computes the disjoint
//! `{added, modified, removed}` sets against the current filesystem on every
//! [`FileSynchronizer::sync`] cycle. The manifest is replaced atomically so
//! restarts never observe a torn file.

pub mod hash;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::error::{Error, Result};
use crate::domain::types::SyncChanges;
use crate::infrastructure::{fsio, paths};

/// Directories excluded from walking before any ignore file is consulted.
const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".venv",
    "venv",
    "__pycache__",
    ".idea",
    ".vscode",
];

/// One manifest entry: content hash plus modification time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Fixed-width content hash of the file bytes
    pub hash: String,
    /// Modification time, milliseconds since the Unix epoch
    pub mtime_ms: i64,
}

/// Durable mapping of relative paths to content hashes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Entries keyed by relative path
    pub entries: BTreeMap<String, ManifestEntry>,
}

/// Per-codebase synchronizer between the filesystem and the manifest.
pub struct FileSynchronizer {
    root: PathBuf,
    manifest_path: PathBuf,
    ignore_patterns: Vec<glob::Pattern>,
    state: Mutex<Manifest>,
}

impl FileSynchronizer {
    /// Create a synchronizer for `root` with extra gitignore-style patterns.
    /// The manifest lands at the stable per-codebase path under the data
    /// directory.
    pub fn new(root: impl Into<PathBuf>, ignore_patterns: &[String]) -> Self {
        let root = root.into();
        let manifest_path = paths::manifest_path(&root);
        Self::with_manifest_path(root, manifest_path, ignore_patterns)
    }

    /// Create a synchronizer with an explicit manifest location (tests).
    pub fn with_manifest_path(
        root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        ignore_patterns: &[String],
    ) -> Self {
        let ignore_patterns = ignore_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "skipping bad ignore pattern");
                    None
                }
            })
            .collect();
        Self {
            root: root.into(),
            manifest_path: manifest_path.into(),
            ignore_patterns,
            state: Mutex::new(Manifest::default()),
        }
    }

    /// Load the persisted manifest if present; otherwise start empty.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match tokio::fs::read(&self.manifest_path).await {
            Ok(bytes) => {
                *state = serde_json::from_slice(&bytes)?;
                tracing::debug!(
                    manifest = %self.manifest_path.display(),
                    files = state.entries.len(),
                    "loaded manifest"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                *state = Manifest::default();
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Number of files tracked by the current manifest.
    pub async fn tracked_files(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Walk the codebase, classify every path against the previous manifest,
    /// and atomically replace the manifest with the post-sync reality.
    ///
    /// Files that cannot be read are logged and treated as removed for this
    /// cycle. The whole sync fails only when the new manifest cannot be
    /// written, in which case the previous manifest stays in force.
    pub async fn sync(&self) -> Result<SyncChanges> {
        let mut state = self.state.lock().await;

        let root = self.root.clone();
        let patterns = self.ignore_patterns.clone();
        let hashed = tokio::task::spawn_blocking(move || walk_and_hash(&root, &patterns))
            .await
            .map_err(|e| Error::internal(format!("sync worker panicked: {e}")))?;

        let mut new_manifest = Manifest::default();
        let mut changes = SyncChanges::default();
        for (relative, outcome) in hashed {
            match outcome {
                Some(entry) => {
                    match state.entries.get(&relative) {
                        None => changes.added.push(relative.clone()),
                        Some(previous) if previous.hash != entry.hash => {
                            changes.modified.push(relative.clone())
                        }
                        Some(_) => {}
                    }
                    new_manifest.entries.insert(relative, entry);
                }
                None => {
                    tracing::warn!(file = %relative, "unreadable during sync, treating as removed");
                }
            }
        }
        for relative in state.entries.keys() {
            if !new_manifest.entries.contains_key(relative) {
                changes.removed.push(relative.clone());
            }
        }
        changes.added.sort();
        changes.modified.sort();
        changes.removed.sort();

        fsio::write_json_atomic(&self.manifest_path, &new_manifest).await?;
        *state = new_manifest;

        tracing::debug!(
            added = changes.added.len(),
            modified = changes.modified.len(),
            removed = changes.removed.len(),
            "sync cycle complete"
        );
        Ok(changes)
    }

    /// Remove the durable manifest and reset the in-memory state.
    pub async fn delete_manifest(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match tokio::fs::remove_file(&self.manifest_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *state = Manifest::default();
        Ok(())
    }
}

/// Delete the durable manifest for a codebase without constructing a
/// synchronizer (used by index clearing).
pub async fn remove_manifest_for(codebase: &Path) -> Result<()> {
    let path = paths::manifest_path(codebase);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Walk `root` honoring ignore rules, hashing files in parallel.
fn walk_and_hash(
    root: &Path,
    patterns: &[glob::Pattern],
) -> Vec<(String, Option<ManifestEntry>)> {
    let mut files = Vec::new();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                && DEFAULT_IGNORE_DIRS.contains(&name.as_ref()))
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "walk error");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().into_owned();
        if patterns
            .iter()
            .any(|p| p.matches(&relative) || matches_component(p, &relative))
        {
            continue;
        }
        files.push((relative, entry.into_path()));
    }

    files
        .into_par_iter()
        .map(|(relative, path)| {
            let entry = hash::hash_file(&path).map(|hash| ManifestEntry {
                hash,
                mtime_ms: file_mtime_ms(&path),
            });
            (relative, entry)
        })
        .collect()
}

fn matches_component(pattern: &glob::Pattern, relative: &str) -> bool {
    relative.split('/').any(|part| pattern.matches(part))
}

/// Modification time in epoch milliseconds; zero when unavailable.
pub fn file_mtime_ms(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
