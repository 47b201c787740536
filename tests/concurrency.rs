//! Concurrency, cancellation, and chunk-cap behavior

use async_trait::async_trait;
use code_context::application::{Context, IndexOptions};
use code_context::domain::error::{Error, Result};
use code_context::domain::ports::{Embedder, Embedding, VectorStore};
use code_context::domain::types::{IndexOutcome, IndexState, IndexerConfig};
use code_context::infrastructure::paths;
use code_context::infrastructure::snapshot::SnapshotManager;
use code_context::providers::{HashEmbedder, MemoryVectorStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Embedder that signals batch entry and waits for release, so tests can
/// hold an indexing task at a deterministic point.
struct GatedEmbedder {
    inner: HashEmbedder,
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

#[async_trait]
impl Embedder for GatedEmbedder {
    async fn detect_dimension(&self, probe: Option<&str>) -> Result<usize> {
        self.inner.detect_dimension(probe).await
    }
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.inner.embed(text).await
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.entered.add_permits(1);
        let _permit = self
            .release
            .acquire()
            .await
            .map_err(|e| Error::internal(e.to_string()))?;
        self.inner.embed_batch(texts).await
    }
    async fn dimension(&self) -> Result<usize> {
        self.inner.dimension().await
    }
    fn provider(&self) -> &'static str {
        "gated"
    }
    fn max_tokens(&self) -> usize {
        self.inner.max_tokens()
    }
}

/// Embedder that cancels a token once a given number of batches completed.
struct CancellingEmbedder {
    inner: HashEmbedder,
    token: CancellationToken,
    after_batches: usize,
    batches: AtomicUsize,
}

#[async_trait]
impl Embedder for CancellingEmbedder {
    async fn detect_dimension(&self, probe: Option<&str>) -> Result<usize> {
        self.inner.detect_dimension(probe).await
    }
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.inner.embed(text).await
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let done = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if done >= self.after_batches {
            self.token.cancel();
        }
        self.inner.embed_batch(texts).await
    }
    async fn dimension(&self) -> Result<usize> {
        self.inner.dimension().await
    }
    fn provider(&self) -> &'static str {
        "cancelling"
    }
    fn max_tokens(&self) -> usize {
        self.inner.max_tokens()
    }
}

fn small_batch_config() -> IndexerConfig {
    IndexerConfig {
        embedding_batch_size: Some(2),
        ..IndexerConfig::default()
    }
}

fn write_files(dir: &std::path::Path, count: usize) {
    for i in 0..count {
        std::fs::write(
            dir.join(format!("file{i}.rs")),
            format!("fn function_{i}() {{ let value = {i}; }}\n"),
        )
        .unwrap();
    }
}

#[tokio::test]
async fn concurrent_requests_for_one_codebase_are_rejected() {
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_files(codebase.path(), 4);

    let entered = Arc::new(Semaphore::new(0));
    let release = Arc::new(Semaphore::new(0));
    let embedder = Arc::new(GatedEmbedder {
        inner: HashEmbedder::new(8),
        entered: entered.clone(),
        release: release.clone(),
    });
    let context = Arc::new(
        Context::new(embedder, Arc::new(MemoryVectorStore::new()))
            .with_snapshot(Arc::new(SnapshotManager::at(
                state.path().join("snapshot.json"),
            )))
            .with_indexer_config(small_batch_config()),
    );

    let first = {
        let context = context.clone();
        let path = codebase.path().to_path_buf();
        tokio::spawn(async move { context.index_codebase(&path, IndexOptions::default()).await })
    };

    // Wait until the first task is held inside an embedding batch.
    let permit = entered.acquire().await.unwrap();
    drop(permit);

    let err = context
        .index_codebase(codebase.path(), IndexOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyIndexing { .. }));
    assert!(matches!(
        context.indexing_status(codebase.path()).await.unwrap(),
        IndexState::Indexing { .. }
    ));

    // Let the first run finish all remaining batches.
    release.add_permits(64);
    let stats = first.await.unwrap().unwrap();
    assert_eq!(stats.outcome, IndexOutcome::Completed);
    assert!(context.has_index(codebase.path()).await.unwrap());
}

#[tokio::test]
async fn cancellation_commits_the_current_batch_and_resets_state() {
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_files(codebase.path(), 12);

    let token = CancellationToken::new();
    let embedder = Arc::new(CancellingEmbedder {
        inner: HashEmbedder::new(8),
        token: token.clone(),
        after_batches: 1,
        batches: AtomicUsize::new(0),
    });
    let store = Arc::new(MemoryVectorStore::new());
    let context = Context::new(embedder, store.clone())
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_indexer_config(small_batch_config());

    let err = context
        .index_codebase(
            codebase.path(),
            IndexOptions {
                cancellation: Some(token),
                ..IndexOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    // Not indexed, not indexing; committed batches remain in the collection.
    assert_eq!(
        context.indexing_status(codebase.path()).await.unwrap(),
        IndexState::NotIndexed
    );
    let canonical = codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    let committed = store
        .query(&collection, "id != ''", &["id"], None)
        .await
        .unwrap();
    assert!(!committed.is_empty(), "committed batches survive");
    assert!(committed.len() < 12, "run stopped early");
}

#[tokio::test]
async fn cancel_indexing_stops_a_running_task() {
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_files(codebase.path(), 8);

    let entered = Arc::new(Semaphore::new(0));
    let release = Arc::new(Semaphore::new(0));
    let embedder = Arc::new(GatedEmbedder {
        inner: HashEmbedder::new(8),
        entered: entered.clone(),
        release: release.clone(),
    });
    let context = Arc::new(
        Context::new(embedder, Arc::new(MemoryVectorStore::new()))
            .with_snapshot(Arc::new(SnapshotManager::at(
                state.path().join("snapshot.json"),
            )))
            .with_indexer_config(small_batch_config()),
    );

    let task = {
        let context = context.clone();
        let path = codebase.path().to_path_buf();
        tokio::spawn(async move { context.index_codebase(&path, IndexOptions::default()).await })
    };

    let permit = entered.acquire().await.unwrap();
    drop(permit);
    assert!(context.cancel_indexing(codebase.path()));
    release.add_permits(64);

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!context.cancel_indexing(codebase.path()), "task is gone");
    assert_eq!(
        context.indexing_status(codebase.path()).await.unwrap(),
        IndexState::NotIndexed
    );
}

#[tokio::test]
async fn chunk_cap_stops_the_run_with_limit_reached() {
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_files(codebase.path(), 6);

    let store = Arc::new(MemoryVectorStore::new());
    let context = Context::new(Arc::new(HashEmbedder::new(8)), store.clone())
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_indexer_config(IndexerConfig {
            embedding_batch_size: Some(2),
            max_chunks: 3,
            ..IndexerConfig::default()
        });

    let stats = context
        .index_codebase(codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.outcome, IndexOutcome::LimitReached);
    assert!(stats.chunks_indexed < 6);

    let canonical = codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    let rows = store
        .query(&collection, "id != ''", &["id"], None)
        .await
        .unwrap();
    assert_eq!(rows.len(), stats.chunks_indexed);
}

#[tokio::test]
async fn different_codebases_index_concurrently() {
    let codebase_a = tempfile::tempdir().unwrap();
    let codebase_b = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_files(codebase_a.path(), 3);
    write_files(codebase_b.path(), 3);

    let context = Arc::new(
        Context::new(Arc::new(HashEmbedder::new(8)), Arc::new(MemoryVectorStore::new()))
            .with_snapshot(Arc::new(SnapshotManager::at(
                state.path().join("snapshot.json"),
            )))
            .with_indexer_config(small_batch_config()),
    );

    let (a, b) = tokio::join!(
        context.index_codebase(codebase_a.path(), IndexOptions::default()),
        context.index_codebase(codebase_b.path(), IndexOptions::default()),
    );
    assert_eq!(a.unwrap().files_indexed, 3);
    assert_eq!(b.unwrap().files_indexed, 3);
    assert!(context.has_index(codebase_a.path()).await.unwrap());
    assert!(context.has_index(codebase_b.path()).await.unwrap());
}
