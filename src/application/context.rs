//! Indexing and retrieval orchestrator
//!
//! [`Context`] drives the whole pipeline: it resolves the collection for a
//! codebase, synchronizes the manifest against the filesystem, splits and
//! embeds affected files in batches, upserts documents, runs the
//! import-frequency post-pass, and serves ranked semantic queries. Each
//! codebase admits at most one indexing task at a time; different codebases
//! index concurrently.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::chunking::{CodeSplitter, SplitterKind};
use crate::domain::error::{Error, Result};
use crate::domain::ports::{document_from_row, Embedder, SearchOptions, VectorStore};
use crate::domain::types::{
    CodeChunk, IndexOutcome, IndexPhase, IndexState, IndexStats, IndexerConfig, Language,
    RankingConfig, SearchResponse, SemanticSearchResult, SyncChanges, VectorDocument,
    META_CODEBASE_PATH, META_IMPORT_COUNT, META_LANGUAGE, META_MAX_IMPORT_COUNT,
};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::paths;
use crate::infrastructure::snapshot::SnapshotManager;
use crate::infrastructure::sync::{self, FileSynchronizer};

use super::imports;
use super::progress::{ProgressCallback, ProgressReporter};
use super::ranking;

/// Extensions indexed by default; callers may extend the set per request.
const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "c", "h", "cpp",
    "cc", "hpp", "cs", "rb", "php", "swift", "kt", "kts", "scala", "sh", "sql", "md", "yaml",
    "yml", "toml", "json",
];

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Options for one indexing request.
#[derive(Clone, Default)]
pub struct IndexOptions {
    /// Clear the existing collection and manifest before indexing
    pub force: bool,
    /// Splitter variant; defaults to the syntax-aware splitter
    pub splitter: Option<SplitterKind>,
    /// Extra file extensions (without dot) to index
    pub custom_extensions: Vec<String>,
    /// Extra gitignore-style patterns to exclude
    pub ignore_patterns: Vec<String>,
    /// Progress callback, forwarded through a bounded queue
    pub progress: Option<ProgressCallback>,
    /// Cancellation signal; the in-flight batch commits before the task stops
    pub cancellation: Option<CancellationToken>,
}

/// Options for one search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Natural-language query
    pub query: String,
    /// Maximum results returned
    pub limit: usize,
    /// Results below this raw similarity are discarded before ranking
    pub min_score: f32,
    /// Restrict results to these extensions (without dot)
    pub extension_filter: Vec<String>,
    /// Additional raw filter expression, combined with the extension filter
    pub filter_expr: Option<String>,
    /// Override the configured ranking switch
    pub enable_ranking: Option<bool>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: 10,
            min_score: 0.0,
            extension_filter: Vec::new(),
            filter_expr: None,
            enable_ranking: None,
        }
    }
}

struct ActiveTask {
    token: CancellationToken,
    percentage: Arc<AtomicU8>,
}

/// Orchestrator owning the embedding provider, the vector store, the
/// snapshot, and the per-codebase indexing registry.
pub struct Context {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    snapshot: Arc<SnapshotManager>,
    clock: Arc<dyn Clock>,
    indexer_config: IndexerConfig,
    ranking_config: RankingConfig,
    active: DashMap<String, ActiveTask>,
}

impl Context {
    /// Create a context with default configuration and the well-known
    /// snapshot location.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            snapshot: Arc::new(SnapshotManager::new()),
            clock: Arc::new(SystemClock),
            indexer_config: IndexerConfig::default(),
            ranking_config: RankingConfig::default(),
            active: DashMap::new(),
        }
    }

    /// Replace the snapshot manager (tests, custom data directories).
    pub fn with_snapshot(mut self, snapshot: Arc<SnapshotManager>) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the indexer configuration.
    pub fn with_indexer_config(mut self, config: IndexerConfig) -> Self {
        self.indexer_config = config;
        self
    }

    /// Replace the ranking configuration.
    pub fn with_ranking_config(mut self, config: RankingConfig) -> Self {
        self.ranking_config = config;
        self
    }

    /// The snapshot manager owned by this context.
    pub fn snapshot(&self) -> &Arc<SnapshotManager> {
        &self.snapshot
    }

    /// Load the snapshot and reconcile it against the vector store.
    ///
    /// Returns the codebases dropped because their collection is gone.
    /// Store errors keep entries in place.
    pub async fn initialize(&self) -> Result<Vec<String>> {
        self.snapshot.load().await?;
        self.snapshot.verify(self.store.as_ref()).await
    }

    /// Index a codebase incrementally.
    ///
    /// Concurrent requests for the same canonical path fail with
    /// `AlreadyIndexing`; different codebases index concurrently. On
    /// failure or cancellation the codebase returns to the unknown state
    /// with the collection left consistent at the last committed batch.
    pub async fn index_codebase(
        &self,
        path: impl AsRef<Path>,
        options: IndexOptions,
    ) -> Result<IndexStats> {
        let canonical = validate_codebase(path.as_ref())?;
        let key = canonical.to_string_lossy().into_owned();

        let token = options.cancellation.clone().unwrap_or_default();
        let percentage = Arc::new(AtomicU8::new(0));
        match self.active.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::already_indexing(key));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ActiveTask {
                    token: token.clone(),
                    percentage: percentage.clone(),
                });
            }
        }

        let result = self
            .run_index(&canonical, &key, &options, &token, &percentage)
            .await;
        self.active.remove(&key);

        match &result {
            Ok(stats) => {
                if let Err(e) = self.snapshot.set_indexed(&key).await {
                    tracing::warn!(codebase = %key, error = %e, "snapshot write failed");
                }
                tracing::info!(
                    codebase = %key,
                    chunks = stats.chunks_indexed,
                    outcome = ?stats.outcome,
                    "indexing complete"
                );
            }
            Err(e) => {
                // Failure and cancellation both return the codebase to the
                // unknown state; committed batches stay in the collection.
                self.snapshot.set_unknown(&key).await.ok();
                tracing::warn!(codebase = %key, error = %e, "indexing did not complete");
            }
        }
        result
    }

    async fn run_index(
        &self,
        canonical: &Path,
        key: &str,
        options: &IndexOptions,
        token: &CancellationToken,
        percentage: &Arc<AtomicU8>,
    ) -> Result<IndexStats> {
        let started = std::time::Instant::now();
        let collection = paths::collection_name(canonical);

        if options.force {
            self.clear_collection_and_manifest(canonical, key, &collection)
                .await?;
        }

        self.snapshot.set_indexing(key, 0).await?;
        let reporter = ProgressReporter::new(options.progress.clone());
        reporter.report(IndexPhase::Scanning, 0, 1, 0);

        let dimension = self.embedder.dimension().await?;
        self.store.create_collection(&collection, dimension).await?;

        let mut ignore_patterns = self.indexer_config.ignore_patterns.clone();
        ignore_patterns.extend(options.ignore_patterns.iter().cloned());
        let synchronizer = FileSynchronizer::new(canonical, &ignore_patterns);
        synchronizer.initialize().await?;
        let changes = synchronizer.sync().await?;
        reporter.report(IndexPhase::Scanning, 1, 1, 5);
        self.set_progress(key, percentage, 5).await;

        let chunks_deleted = self
            .delete_stale_documents(&collection, key, &changes)
            .await?;

        let extensions = self.indexable_extensions(&options.custom_extensions);
        let to_index: Vec<String> = changes
            .added
            .iter()
            .chain(changes.modified.iter())
            .filter(|path| has_indexable_extension(path, &extensions))
            .cloned()
            .collect();

        let splitter = CodeSplitter::new(
            options.splitter.unwrap_or_default(),
            self.indexer_config.chunk_size,
            self.indexer_config.chunk_overlap,
        );
        let batch_size = self
            .indexer_config
            .embedding_batch_size
            .unwrap_or_else(|| self.embedder.batch_size_hint())
            .max(1);

        // The chunk cap applies to the collection total, not just this run.
        let mut total_chunks = self.count_codebase_documents(&collection, key).await?;
        let mut chunks_indexed = 0usize;
        let mut files_indexed = 0usize;
        let mut pending: Vec<(CodeChunk, i64)> = Vec::new();
        let mut outcome = IndexOutcome::Completed;

        'files: for (file_index, relative) in to_index.iter().enumerate() {
            if token.is_cancelled() {
                self.flush_batch(&collection, key, &mut pending, &reporter)
                    .await?;
                return Err(Error::Cancelled);
            }

            let absolute = canonical.join(relative);
            let content = match tokio::fs::read_to_string(&absolute).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %relative, error = %e, "unreadable file skipped");
                    continue;
                }
            };
            let language = Language::from_extension(extension_of(relative));
            let chunks = splitter.split(&content, language, relative);
            if chunks.is_empty() {
                tracing::debug!(file = %relative, "no chunks produced");
                continue;
            }
            files_indexed += 1;
            let mtime_ms = sync::file_mtime_ms(&absolute);

            let overall = 5 + (file_index * 90 / to_index.len().max(1)) as u8;
            reporter.report(IndexPhase::Chunking, file_index + 1, to_index.len(), overall);
            self.set_progress(key, percentage, overall).await;

            for chunk in chunks {
                pending.push((chunk, mtime_ms));
                if pending.len() >= batch_size {
                    let written = self
                        .flush_batch(&collection, key, &mut pending, &reporter)
                        .await?;
                    chunks_indexed += written;
                    total_chunks += written;
                    if total_chunks >= self.indexer_config.max_chunks {
                        tracing::warn!(
                            codebase = %key,
                            total_chunks,
                            "chunk cap reached, stopping early"
                        );
                        outcome = IndexOutcome::LimitReached;
                        break 'files;
                    }
                }
            }
        }

        if outcome == IndexOutcome::Completed {
            let written = self
                .flush_batch(&collection, key, &mut pending, &reporter)
                .await?;
            chunks_indexed += written;
        }

        self.set_progress(key, percentage, 95).await;
        // Import counts are only refreshed when the run changed documents,
        // so an idempotent re-run stays write-free.
        if chunks_indexed > 0 || chunks_deleted > 0 {
            self.refresh_import_metadata(&collection, key, batch_size)
                .await?;
        }
        self.set_progress(key, percentage, 100).await;

        Ok(IndexStats {
            outcome,
            files_changed: changes.total_changes(),
            files_indexed,
            chunks_indexed,
            chunks_deleted,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Embed and upsert the pending batch; retried with exponential backoff.
    async fn flush_batch(
        &self,
        collection: &str,
        codebase: &str,
        pending: &mut Vec<(CodeChunk, i64)>,
        reporter: &ProgressReporter,
    ) -> Result<usize> {
        if pending.is_empty() {
            return Ok(0);
        }
        let batch: Vec<(CodeChunk, i64)> = std::mem::take(pending);
        let texts: Vec<String> = batch.iter().map(|(c, _)| c.content.clone()).collect();

        reporter.report(IndexPhase::Embedding, 0, texts.len(), 0);
        let embeddings = self
            .with_retry("embed batch", || self.embedder.embed_batch(&texts))
            .await?;
        if embeddings.len() != batch.len() {
            return Err(Error::invalid_response(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let documents: Vec<VectorDocument> = batch
            .iter()
            .zip(embeddings)
            .map(|((chunk, mtime_ms), embedding)| {
                self.document_for_chunk(chunk, *mtime_ms, codebase, embedding.vector)
            })
            .collect();

        reporter.report(IndexPhase::Writing, 0, documents.len(), 0);
        let count = documents.len();
        self.with_retry("insert batch", || {
            self.store.insert(collection, documents.clone())
        })
        .await?;
        reporter.report(IndexPhase::Writing, count, count, 0);
        Ok(count)
    }

    fn document_for_chunk(
        &self,
        chunk: &CodeChunk,
        mtime_ms: i64,
        codebase: &str,
        vector: Vec<f32>,
    ) -> VectorDocument {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            META_CODEBASE_PATH.to_string(),
            serde_json::json!(codebase),
        );
        metadata.insert(
            META_LANGUAGE.to_string(),
            serde_json::json!(chunk.language.as_str()),
        );
        VectorDocument {
            id: chunk_id(&chunk.file_path, chunk.start_line, chunk.end_line),
            vector,
            content: chunk.content.clone(),
            relative_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            file_extension: extension_of(&chunk.file_path).to_string(),
            mtime_ms,
            metadata,
        }
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_non_retryable() => return Err(e),
                Err(e) if attempt >= self.indexer_config.max_batch_retries => {
                    tracing::warn!(operation = what, attempts = attempt, error = %e, "retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(operation = what, attempt, error = %e, "retrying after backoff");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Delete documents belonging to modified or removed files.
    async fn delete_stale_documents(
        &self,
        collection: &str,
        codebase: &str,
        changes: &SyncChanges,
    ) -> Result<usize> {
        let affected: HashSet<&String> =
            changes.modified.iter().chain(changes.removed.iter()).collect();
        if affected.is_empty() {
            return Ok(0);
        }

        let rows = self
            .store
            .query(
                collection,
                &codebase_scope_filter(codebase),
                &["id", "relative_path"],
                None,
            )
            .await?;
        let ids: Vec<String> = rows
            .iter()
            .filter(|row| {
                row.get("relative_path")
                    .and_then(|v| v.as_str())
                    .map(|p| affected.contains(&p.to_string()))
                    .unwrap_or(false)
            })
            .filter_map(|row| row.get("id").and_then(|v| v.as_str()).map(String::from))
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.store.delete(collection, &ids).await?;
        tracing::debug!(collection, deleted = ids.len(), "removed stale documents");
        Ok(ids.len())
    }

    async fn count_codebase_documents(&self, collection: &str, codebase: &str) -> Result<usize> {
        let rows = self
            .store
            .query(collection, &codebase_scope_filter(codebase), &["id"], None)
            .await?;
        Ok(rows.len())
    }

    /// Recompute per-file import counts and rewrite document metadata.
    ///
    /// Runs strictly after every file batch of the run has been committed.
    async fn refresh_import_metadata(
        &self,
        collection: &str,
        codebase: &str,
        batch_size: usize,
    ) -> Result<()> {
        let scope = codebase_scope_filter(codebase);
        let rows = self
            .store
            .query(collection, &scope, &["relative_path", "content"], None)
            .await?;
        if rows.is_empty() {
            return Ok(());
        }

        let mut files: BTreeMap<String, String> = BTreeMap::new();
        for row in &rows {
            let (Some(path), Some(content)) = (
                row.get("relative_path").and_then(|v| v.as_str()),
                row.get("content").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let entry = files.entry(path.to_string()).or_default();
            entry.push_str(content);
            entry.push('\n');
        }

        let counts = imports::count_imports(&files);
        let max_count = counts.values().copied().max().unwrap_or(0);
        if max_count == 0 {
            return Ok(());
        }

        let full_rows = self.store.query(collection, &scope, &[], None).await?;
        let mut batch: Vec<VectorDocument> = Vec::new();
        for row in &full_rows {
            let Some(mut doc) = document_from_row(row) else {
                continue;
            };
            let count = counts.get(&doc.relative_path).copied().unwrap_or(0);
            doc.metadata
                .insert(META_IMPORT_COUNT.to_string(), serde_json::json!(count));
            doc.metadata.insert(
                META_MAX_IMPORT_COUNT.to_string(),
                serde_json::json!(max_count),
            );
            batch.push(doc);
            if batch.len() >= batch_size {
                let documents = std::mem::take(&mut batch);
                self.with_retry("import metadata batch", || {
                    self.store.insert(collection, documents.clone())
                })
                .await?;
            }
        }
        if !batch.is_empty() {
            self.with_retry("import metadata batch", || {
                self.store.insert(collection, batch.clone())
            })
            .await?;
        }
        tracing::debug!(collection, max_count, "import metadata refreshed");
        Ok(())
    }

    async fn set_progress(&self, key: &str, percentage: &Arc<AtomicU8>, value: u8) {
        percentage.store(value, Ordering::Relaxed);
        self.snapshot.set_indexing(key, value).await.ok();
    }

    /// Signal the running indexing task for `path` to stop.
    ///
    /// The in-flight batch commits before the task returns `Cancelled`.
    /// Returns false when no task is running for this codebase.
    pub fn cancel_indexing(&self, path: impl AsRef<Path>) -> bool {
        let canonical = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let key = canonical.to_string_lossy().into_owned();
        match self.active.get(&key) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    /// True when the collection exists and holds at least one document for
    /// this codebase.
    pub async fn has_index(&self, path: impl AsRef<Path>) -> Result<bool> {
        let Ok(canonical) = path.as_ref().canonicalize() else {
            return Ok(false);
        };
        let collection = paths::collection_name(&canonical);
        if !self.store.has_collection(&collection).await? {
            return Ok(false);
        }
        let key = canonical.to_string_lossy().into_owned();
        let rows = self
            .store
            .query(&collection, &codebase_scope_filter(&key), &["id"], Some(1))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Drop the collection, delete the manifest, and forget the codebase.
    pub async fn clear_index(&self, path: impl AsRef<Path>) -> Result<()> {
        let canonical = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let key = canonical.to_string_lossy().into_owned();
        let collection = paths::collection_name(&canonical);
        self.clear_collection_and_manifest(&canonical, &key, &collection)
            .await
    }

    async fn clear_collection_and_manifest(
        &self,
        canonical: &Path,
        key: &str,
        collection: &str,
    ) -> Result<()> {
        match self.store.drop_collection(collection).await {
            Ok(()) => {}
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        sync::remove_manifest_for(canonical).await?;
        self.snapshot.set_unknown(key).await?;
        tracing::info!(codebase = %key, "index cleared");
        Ok(())
    }

    /// Observable indexing state for the tool surface.
    pub async fn indexing_status(&self, path: impl AsRef<Path>) -> Result<IndexState> {
        let canonical = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let key = canonical.to_string_lossy().into_owned();

        if let Some(task) = self.active.get(&key) {
            return Ok(IndexState::Indexing {
                percentage: task.percentage.load(Ordering::Relaxed),
            });
        }
        if let Some(percentage) = self.snapshot.indexing_percentage(&key).await {
            return Ok(IndexState::Indexing { percentage });
        }
        // The snapshot is authoritative here: a cancelled or failed run may
        // leave committed batches in the collection without the codebase
        // counting as indexed.
        if self.snapshot.is_indexed(&key).await {
            return Ok(IndexState::Indexed);
        }
        Ok(IndexState::NotIndexed)
    }

    /// Ranked semantic search over an indexed codebase.
    ///
    /// Fails with `NotIndexed` when no collection exists. Searches during
    /// active indexing succeed and set the advisory flag on the response.
    pub async fn semantic_search(
        &self,
        path: impl AsRef<Path>,
        request: SearchRequest,
    ) -> Result<SearchResponse> {
        let canonical = validate_codebase(path.as_ref())?;
        let key = canonical.to_string_lossy().into_owned();
        let collection = paths::collection_name(&canonical);

        if !self.store.has_collection(&collection).await? {
            return Err(Error::not_indexed(key));
        }

        let ranking_enabled = request
            .enable_ranking
            .unwrap_or(self.ranking_config.enabled);
        let top_k = if ranking_enabled {
            (request.limit * 2).clamp(20, 100)
        } else {
            request.limit
        };

        let query_embedding = self.embedder.embed(&request.query).await?;
        let filter_expr = build_search_filter(&request);
        let mut scored = self
            .store
            .search(
                &collection,
                &query_embedding.vector,
                &SearchOptions {
                    top_k,
                    filter_expr,
                },
            )
            .await?;
        scored.retain(|r| r.score >= request.min_score);

        let config = RankingConfig {
            enabled: ranking_enabled,
            ..self.ranking_config.clone()
        };
        let ranked = ranking::apply_ranking(scored, &request.query, &config, self.clock.now_ms());

        let results: Vec<SemanticSearchResult> = ranked
            .into_iter()
            .take(request.limit)
            .map(|r| SemanticSearchResult {
                language: r
                    .document
                    .metadata
                    .get(META_LANGUAGE)
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                relative_path: r.document.relative_path,
                start_line: r.document.start_line,
                end_line: r.document.end_line,
                content: r.document.content,
                score: r.score,
            })
            .collect();

        Ok(SearchResponse {
            results,
            indexing: self.active.contains_key(&key),
        })
    }

    fn indexable_extensions(&self, custom: &[String]) -> HashSet<String> {
        DEFAULT_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .chain(self.indexer_config.custom_extensions.iter().cloned())
            .chain(custom.iter().cloned())
            .map(|s| s.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

fn validate_codebase(path: &Path) -> Result<PathBuf> {
    let display = path.display().to_string();
    let metadata =
        std::fs::metadata(path).map_err(|_| Error::path_not_found(display.clone()))?;
    if !metadata.is_dir() {
        return Err(Error::not_a_directory(display));
    }
    Ok(path.canonicalize()?)
}

/// Deterministic document id over the chunk's location.
fn chunk_id(relative_path: &str, start_line: u32, end_line: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    hasher.update(b":");
    hasher.update(start_line.to_le_bytes());
    hasher.update(end_line.to_le_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    hex[..32].to_string()
}

fn extension_of(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

fn has_indexable_extension(path: &str, extensions: &HashSet<String>) -> bool {
    extensions.contains(&extension_of(path).to_lowercase())
}

/// Quote a literal for the filter language, picking whichever quote the
/// value does not contain. `None` when the value holds both quote kinds.
fn quote_literal(value: &str) -> Option<String> {
    if !value.contains('\'') {
        Some(format!("'{value}'"))
    } else if !value.contains('"') {
        Some(format!("\"{value}\""))
    } else {
        None
    }
}

/// Scope filter for one codebase; degrades to match-all when the path
/// cannot be quoted (the collection is per-codebase anyway).
fn codebase_scope_filter(codebase: &str) -> String {
    match quote_literal(codebase) {
        Some(quoted) => format!("metadata.{META_CODEBASE_PATH} == {quoted}"),
        None => "id != ''".to_string(),
    }
}

fn build_search_filter(request: &SearchRequest) -> Option<String> {
    let mut clauses = Vec::new();
    if !request.extension_filter.is_empty() {
        let quoted: Vec<String> = request
            .extension_filter
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter_map(|e| quote_literal(&e))
            .collect();
        if !quoted.is_empty() {
            clauses.push(format!("file_extension in [{}]", quoted.join(", ")));
        }
    }
    if let Some(expr) = &request.filter_expr {
        if !expr.trim().is_empty() {
            clauses.push(format!("({expr})"));
        }
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" and "))
    }
}
