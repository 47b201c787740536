//! Process-global index snapshot
//!
//! Durable record of which codebases are indexed or being indexed. Loaded at
//! startup, verified against the vector store, and rewritten atomically only
//! when the in-memory state actually differs from the last write. Progress
//! updates are throttled so a hot indexing loop does not hammer the disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::error::Result;
use crate::domain::ports::VectorStore;
use crate::infrastructure::{fsio, paths};

/// Minimum spacing between progress-driven snapshot writes.
const PROGRESS_WRITE_INTERVAL: Duration = Duration::from_secs(2);

/// A codebase currently being indexed, with reported completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingEntry {
    /// Absolute codebase path
    pub path: String,
    /// Completion percentage, `0..=100`
    pub percentage: u8,
}

/// Durable snapshot contents.
///
/// Unknown fields written by other versions are preserved across rewrites.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    /// Codebases with a complete index, in insertion order
    #[serde(default)]
    pub indexed_codebases: Vec<String>,
    /// Codebases with an indexing task in flight
    #[serde(default)]
    pub indexing_codebases: Vec<IndexingEntry>,
    /// Timestamp of the last write
    #[serde(default)]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
    /// Fields from newer versions, carried through verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IndexSnapshot {
    /// Serialized form with the volatile timestamp blanked, used to decide
    /// whether a write is actually needed.
    fn canonical(&self) -> String {
        let mut copy = self.clone();
        copy.last_updated = None;
        serde_json::to_string(&copy).unwrap_or_default()
    }
}

struct SnapshotState {
    snapshot: IndexSnapshot,
    last_written: String,
    last_progress_write: Option<Instant>,
}

/// Manager of the durable snapshot file.
pub struct SnapshotManager {
    path: PathBuf,
    state: Mutex<SnapshotState>,
}

impl SnapshotManager {
    /// Manager over the well-known snapshot location.
    pub fn new() -> Self {
        Self::at(paths::snapshot_file())
    }

    /// Manager over an explicit snapshot file (tests).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(SnapshotState {
                snapshot: IndexSnapshot::default(),
                last_written: IndexSnapshot::default().canonical(),
                last_progress_write: None,
            }),
        }
    }

    /// Load the snapshot from disk; a missing file starts empty.
    pub async fn load(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                state.snapshot = serde_json::from_slice(&bytes)?;
                state.last_written = state.snapshot.canonical();
                tracing::debug!(
                    indexed = state.snapshot.indexed_codebases.len(),
                    indexing = state.snapshot.indexing_codebases.len(),
                    "loaded snapshot"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                state.snapshot = IndexSnapshot::default();
                state.last_written = state.snapshot.canonical();
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Current snapshot contents.
    pub async fn current(&self) -> IndexSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Record that `path` started indexing or report updated progress.
    ///
    /// The in-memory state always reflects the latest percentage; the file
    /// is rewritten at most once per throttle interval.
    pub async fn set_indexing(&self, path: &str, percentage: u8) -> Result<()> {
        let mut state = self.state.lock().await;
        match state
            .snapshot
            .indexing_codebases
            .iter()
            .position(|e| e.path == path)
        {
            Some(i) => state.snapshot.indexing_codebases[i].percentage = percentage,
            None => state.snapshot.indexing_codebases.push(IndexingEntry {
                path: path.to_string(),
                percentage,
            }),
        }

        let due = state
            .last_progress_write
            .map(|at| at.elapsed() >= PROGRESS_WRITE_INTERVAL)
            .unwrap_or(true);
        if due {
            state.last_progress_write = Some(Instant::now());
            Self::persist_if_changed(&self.path, &mut state).await?;
        }
        Ok(())
    }

    /// Record that `path` finished indexing successfully.
    pub async fn set_indexed(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.snapshot.indexing_codebases.retain(|e| e.path != path);
        if !state.snapshot.indexed_codebases.iter().any(|p| p == path) {
            state.snapshot.indexed_codebases.push(path.to_string());
        }
        Self::persist_if_changed(&self.path, &mut state).await
    }

    /// Forget `path` entirely (failure, cancellation, cleared index).
    pub async fn set_unknown(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.snapshot.indexing_codebases.retain(|e| e.path != path);
        state.snapshot.indexed_codebases.retain(|p| p != path);
        Self::persist_if_changed(&self.path, &mut state).await
    }

    /// True when `path` is listed as indexed.
    pub async fn is_indexed(&self, path: &str) -> bool {
        self.state
            .lock()
            .await
            .snapshot
            .indexed_codebases
            .iter()
            .any(|p| p == path)
    }

    /// Reported progress for `path` when an indexing task is in flight.
    pub async fn indexing_percentage(&self, path: &str) -> Option<u8> {
        self.state
            .lock()
            .await
            .snapshot
            .indexing_codebases
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.percentage)
    }

    /// Reconcile the snapshot with the vector store at startup.
    ///
    /// Codebases whose collection is gone or empty are dropped; any store
    /// error keeps the entry, because losing snapshot entries on a transient
    /// outage is the worse failure mode. The file is rewritten only when at
    /// least one entry was removed. Returns the removed paths.
    pub async fn verify(&self, store: &dyn VectorStore) -> Result<Vec<String>> {
        let listed = {
            let state = self.state.lock().await;
            state.snapshot.indexed_codebases.clone()
        };

        let mut removed = Vec::new();
        for codebase in listed {
            let collection = paths::collection_name(std::path::Path::new(&codebase));
            match collection_has_data(store, &collection).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(codebase = %codebase, "collection gone, dropping from snapshot");
                    removed.push(codebase);
                }
                Err(e) => {
                    tracing::warn!(codebase = %codebase, error = %e, "verification failed, keeping entry");
                }
            }
        }

        if !removed.is_empty() {
            let mut state = self.state.lock().await;
            state
                .snapshot
                .indexed_codebases
                .retain(|p| !removed.contains(p));
            Self::persist_if_changed(&self.path, &mut state).await?;
        }
        Ok(removed)
    }

    async fn persist_if_changed(path: &std::path::Path, state: &mut SnapshotState) -> Result<()> {
        let canonical = state.snapshot.canonical();
        if canonical == state.last_written {
            return Ok(());
        }
        state.snapshot.last_updated = Some(chrono::Utc::now());
        fsio::write_json_atomic(path, &state.snapshot).await?;
        state.last_written = canonical;
        Ok(())
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a collection exists and holds at least one document.
///
/// Store failures surface as `VerificationInconclusive`; the caller swallows
/// them and keeps the snapshot entry.
async fn collection_has_data(store: &dyn VectorStore, collection: &str) -> Result<bool> {
    let exists = store
        .has_collection(collection)
        .await
        .map_err(|e| crate::domain::error::Error::verification_inconclusive(e.to_string()))?;
    if !exists {
        return Ok(false);
    }
    // `id` is never empty, so this predicate matches every document.
    let rows = store
        .query(collection, "id != ''", &["id"], Some(1))
        .await
        .map_err(|e| crate::domain::error::Error::verification_inconclusive(e.to_string()))?;
    Ok(!rows.is_empty())
}
