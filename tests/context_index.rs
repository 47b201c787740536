//! End-to-end indexing and retrieval through the orchestrator

use code_context::application::{Context, IndexOptions, SearchRequest};
use code_context::domain::error::Error;
use code_context::domain::ports::VectorStore;
use code_context::domain::types::{IndexOutcome, IndexState, IndexerConfig};
use code_context::infrastructure::paths;
use code_context::infrastructure::snapshot::SnapshotManager;
use code_context::providers::{HashEmbedder, MemoryVectorStore};
use std::sync::Arc;

struct Harness {
    context: Context,
    store: Arc<MemoryVectorStore>,
    codebase: tempfile::TempDir,
    _state: tempfile::TempDir,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryVectorStore::new());
    let embedder = Arc::new(HashEmbedder::new(16));
    let context = Context::new(embedder, store.clone())
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_indexer_config(IndexerConfig {
            embedding_batch_size: Some(4),
            ..IndexerConfig::default()
        });
    Harness {
        context,
        store,
        codebase,
        _state: state,
    }
}

fn write_file(harness: &Harness, relative: &str, content: &str) {
    let path = harness.codebase.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn index_then_search_round_trip() {
    let h = harness();
    write_file(
        &h,
        "src/auth.rs",
        "fn authenticate(user: &str) -> bool {\n    !user.is_empty()\n}\n",
    );
    write_file(
        &h,
        "src/parser.rs",
        "fn parse(input: &str) -> Vec<&str> {\n    input.split(',').collect()\n}\n",
    );

    let stats = h
        .context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.outcome, IndexOutcome::Completed);
    assert_eq!(stats.files_indexed, 2);
    assert!(stats.chunks_indexed >= 2);

    assert!(h.context.has_index(h.codebase.path()).await.unwrap());
    assert_eq!(
        h.context.indexing_status(h.codebase.path()).await.unwrap(),
        IndexState::Indexed
    );
    let key = h
        .codebase
        .path()
        .canonicalize()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(h.context.snapshot().is_indexed(&key).await);

    let response = h
        .context
        .semantic_search(
            h.codebase.path(),
            SearchRequest {
                query: "authenticate user".to_string(),
                limit: 5,
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(!response.results.is_empty());
    assert!(!response.indexing);
    for result in &response.results {
        assert!((0.0..=1.0).contains(&result.score));
        assert!(result.start_line >= 1);
        assert!(result.end_line >= result.start_line);
    }
}

#[tokio::test]
async fn second_run_with_no_changes_writes_nothing() {
    let h = harness();
    write_file(&h, "a.rs", "fn a() {}\n");
    write_file(&h, "b.rs", "fn b() {}\n");

    let first = h
        .context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert!(first.chunks_indexed > 0);

    let second = h
        .context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert_eq!(second.files_changed, 0);
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.chunks_indexed, 0);
    assert_eq!(second.chunks_deleted, 0);
}

#[tokio::test]
async fn reindexing_a_modified_file_replaces_its_documents() {
    let h = harness();
    write_file(&h, "lib.rs", "fn original() {}\n");
    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();

    let canonical = h.codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    let before = h
        .store
        .query(&collection, "id != ''", &["id"], None)
        .await
        .unwrap()
        .len();

    write_file(&h, "lib.rs", "fn replacement() {}\n");
    let stats = h
        .context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert!(stats.chunks_deleted >= 1);

    let rows = h
        .store
        .query(&collection, "id != ''", &["id", "content"], None)
        .await
        .unwrap();
    assert_eq!(rows.len(), before, "replace, not duplicate");
    assert!(rows.iter().any(|r| r
        .get("content")
        .and_then(|v| v.as_str())
        .map(|c| c.contains("replacement"))
        .unwrap_or(false)));
}

#[tokio::test]
async fn removed_files_lose_their_documents() {
    let h = harness();
    write_file(&h, "keep.rs", "fn keep() {}\n");
    write_file(&h, "gone.rs", "fn gone() {}\n");
    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();

    std::fs::remove_file(h.codebase.path().join("gone.rs")).unwrap();
    let stats = h
        .context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert!(stats.chunks_deleted >= 1);

    let canonical = h.codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    let rows = h
        .store
        .query(&collection, "relative_path == 'gone.rs'", &["id"], None)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn clear_index_forgets_the_codebase() {
    let h = harness();
    write_file(&h, "a.rs", "fn a() {}\n");
    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();
    assert!(h.context.has_index(h.codebase.path()).await.unwrap());

    h.context.clear_index(h.codebase.path()).await.unwrap();
    assert!(!h.context.has_index(h.codebase.path()).await.unwrap());
    assert_eq!(
        h.context.indexing_status(h.codebase.path()).await.unwrap(),
        IndexState::NotIndexed
    );

    let err = h
        .context
        .semantic_search(
            h.codebase.path(),
            SearchRequest {
                query: "anything".to_string(),
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotIndexed { .. }));
}

#[tokio::test]
async fn searching_an_unindexed_codebase_is_not_indexed() {
    let h = harness();
    write_file(&h, "a.rs", "fn a() {}\n");
    let err = h
        .context
        .semantic_search(
            h.codebase.path(),
            SearchRequest {
                query: "anything".to_string(),
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotIndexed { .. }));
}

#[tokio::test]
async fn missing_path_is_rejected() {
    let h = harness();
    let err = h
        .context
        .index_codebase("/definitely/not/here", IndexOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PathNotFound { .. }));

    let file = h.codebase.path().join("plain.txt");
    std::fs::write(&file, "not a directory").unwrap();
    let err = h
        .context
        .index_codebase(&file, IndexOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotADirectory { .. }));
}

#[tokio::test]
async fn import_counts_land_in_metadata() {
    let h = harness();
    write_file(&h, "utils/common.ts", "export function helper() { return 1; }\n");
    write_file(&h, "utils/rare.ts", "export function seldom() { return 2; }\n");
    write_file(
        &h,
        "feature1.ts",
        "import { helper } from './utils/common';\nhelper();\n",
    );
    write_file(
        &h,
        "feature2.ts",
        "import { helper } from './utils/common';\nhelper();\n",
    );
    write_file(
        &h,
        "feature3.ts",
        "import { helper } from './utils/common';\nhelper();\n",
    );
    write_file(
        &h,
        "feature4.ts",
        "import { seldom } from './utils/rare';\nseldom();\n",
    );

    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();

    let canonical = h.codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    let import_count = |rows: &[code_context::domain::ports::QueryRow]| -> (u64, u64) {
        let metadata = rows[0].get("metadata").unwrap().as_object().unwrap();
        (
            metadata.get("import_count").and_then(|v| v.as_u64()).unwrap(),
            metadata
                .get("max_import_count")
                .and_then(|v| v.as_u64())
                .unwrap(),
        )
    };

    let common = h
        .store
        .query(
            &collection,
            "relative_path == 'utils/common.ts'",
            &["metadata"],
            None,
        )
        .await
        .unwrap();
    assert_eq!(import_count(&common), (3, 3));

    let rare = h
        .store
        .query(
            &collection,
            "relative_path == 'utils/rare.ts'",
            &["metadata"],
            None,
        )
        .await
        .unwrap();
    assert_eq!(import_count(&rare), (1, 3));
}

#[tokio::test]
async fn extension_filter_narrows_results() {
    let h = harness();
    write_file(&h, "a.rs", "fn shared_name() {}\n");
    write_file(&h, "b.py", "def shared_name():\n    pass\n");
    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();

    let response = h
        .context
        .semantic_search(
            h.codebase.path(),
            SearchRequest {
                query: "shared_name".to_string(),
                limit: 10,
                extension_filter: vec!["py".to_string()],
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(!response.results.is_empty());
    assert!(response
        .results
        .iter()
        .all(|r| r.relative_path.ends_with(".py")));
}

#[tokio::test]
async fn forced_reindex_rebuilds_from_scratch() {
    let h = harness();
    write_file(&h, "a.rs", "fn a() {}\n");
    h.context
        .index_codebase(h.codebase.path(), IndexOptions::default())
        .await
        .unwrap();

    let stats = h
        .context
        .index_codebase(
            h.codebase.path(),
            IndexOptions {
                force: true,
                ..IndexOptions::default()
            },
        )
        .await
        .unwrap();
    // The manifest was cleared, so the file counts as added again.
    assert_eq!(stats.files_indexed, 1);
    assert!(stats.chunks_indexed > 0);
    assert!(h.context.has_index(h.codebase.path()).await.unwrap());
}
