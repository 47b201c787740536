//! Ranked search behavior over a hand-seeded collection
//!
//! Documents are inserted directly into the store under the collection the
//! orchestrator derives for the codebase path, so modification times and
//! import metadata can be controlled precisely.

use code_context::application::{Context, SearchRequest};
use code_context::domain::ports::{Embedder, VectorStore};
use code_context::domain::types::{RankingConfig, VectorDocument};
use code_context::infrastructure::clock::FixedClock;
use code_context::infrastructure::paths;
use code_context::infrastructure::snapshot::SnapshotManager;
use code_context::providers::{HashEmbedder, MemoryVectorStore};
use std::collections::BTreeMap;
use std::sync::Arc;

const NOW_MS: i64 = 1_750_000_000_000;
const DAY_MS: i64 = 86_400_000;
const DIMENSION: usize = 16;

async fn doc_for(
    codebase: &std::path::Path,
    relative_path: &str,
    content: &str,
    mtime_ms: i64,
    imports: Option<(u64, u64)>,
) -> VectorDocument {
    let embedder = HashEmbedder::new(DIMENSION);
    let embedding = embedder.embed(content).await.unwrap();
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "codebase_path".to_string(),
        serde_json::json!(codebase.canonicalize().unwrap().to_string_lossy()),
    );
    metadata.insert("language".to_string(), serde_json::json!("typescript"));
    if let Some((count, max)) = imports {
        metadata.insert("import_count".to_string(), serde_json::json!(count));
        metadata.insert("max_import_count".to_string(), serde_json::json!(max));
    }
    VectorDocument {
        id: relative_path.to_string(),
        vector: embedding.vector,
        content: content.to_string(),
        relative_path: relative_path.to_string(),
        start_line: 1,
        end_line: 5,
        file_extension: "ts".to_string(),
        mtime_ms,
        metadata,
    }
}

#[tokio::test]
async fn recency_boosts_the_newer_of_identical_files() {
    let codebase = tempfile::tempdir().unwrap();
    let content = "export function formatTimestamp(ms: number): string { return new Date(ms).toISOString(); }";
    let recent = doc_for(codebase.path(), "recent.ts", content, NOW_MS, None).await;
    let old = doc_for(
        codebase.path(),
        "old.ts",
        content,
        NOW_MS - 730 * DAY_MS,
        None,
    )
    .await;

    // Same temp dir must back the context so the collection matches.
    let state = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryVectorStore::new());
    let canonical = codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    store.create_collection(&collection, DIMENSION).await.unwrap();
    store.insert(&collection, vec![recent, old]).await.unwrap();

    let context = Context::new(Arc::new(HashEmbedder::new(DIMENSION)), store)
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_clock(Arc::new(FixedClock(NOW_MS)))
        .with_ranking_config(RankingConfig {
            recency_half_life_days: 90.0,
            ..RankingConfig::default()
        });

    let ranked = context
        .semantic_search(
            codebase.path(),
            SearchRequest {
                query: "formatTimestamp".to_string(),
                limit: 10,
                enable_ranking: Some(true),
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranked.results.len(), 2);
    assert_eq!(ranked.results[0].relative_path, "recent.ts");
    assert!(ranked.results[0].score >= ranked.results[1].score);

    let unranked = context
        .semantic_search(
            codebase.path(),
            SearchRequest {
                query: "formatTimestamp".to_string(),
                limit: 10,
                enable_ranking: Some(false),
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    // Identical content embeds identically: raw scores tie.
    assert!(
        (unranked.results[0].score - unranked.results[1].score).abs() < 1e-6,
        "without ranking the identical files score the same"
    );
}

#[tokio::test]
async fn frequently_imported_files_outrank_rare_ones() {
    let codebase = tempfile::tempdir().unwrap();
    let content = "export function utility() { /* shared helper */ }";
    let common = doc_for(
        codebase.path(),
        "utils/common.ts",
        content,
        NOW_MS,
        Some((3, 3)),
    )
    .await;
    let rare = doc_for(
        codebase.path(),
        "utils/rare.ts",
        content,
        NOW_MS,
        Some((1, 3)),
    )
    .await;

    let seeded = {
        let state = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let canonical = codebase.path().canonicalize().unwrap();
        let collection = paths::collection_name(&canonical);
        store.create_collection(&collection, DIMENSION).await.unwrap();
        store.insert(&collection, vec![common, rare]).await.unwrap();
        let context = Context::new(Arc::new(HashEmbedder::new(DIMENSION)), store)
            .with_snapshot(Arc::new(SnapshotManager::at(
                state.path().join("snapshot.json"),
            )))
            .with_clock(Arc::new(FixedClock(NOW_MS)));
        (context, state)
    };

    let response = seeded
        .0
        .semantic_search(
            codebase.path(),
            SearchRequest {
                query: "utility function".to_string(),
                limit: 10,
                enable_ranking: Some(true),
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].relative_path, "utils/common.ts");
}

#[tokio::test]
async fn min_score_discards_weak_matches() {
    let codebase = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let a = doc_for(codebase.path(), "a.ts", "alpha content", NOW_MS, None).await;

    let store = Arc::new(MemoryVectorStore::new());
    let canonical = codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    store.create_collection(&collection, DIMENSION).await.unwrap();
    store.insert(&collection, vec![a]).await.unwrap();
    let context = Context::new(Arc::new(HashEmbedder::new(DIMENSION)), store)
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_clock(Arc::new(FixedClock(NOW_MS)));

    // A threshold above any possible similarity empties the result set.
    let response = context
        .semantic_search(
            codebase.path(),
            SearchRequest {
                query: "alpha content".to_string(),
                limit: 10,
                min_score: 1.01,
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(response.results.is_empty());

    // With no threshold the document comes back.
    let response = context
        .semantic_search(
            codebase.path(),
            SearchRequest {
                query: "alpha content".to_string(),
                limit: 10,
                ..SearchRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.results.len(), 1);
}

#[tokio::test]
async fn scores_stay_in_unit_range_with_ranking_on_and_off() {
    let codebase = tempfile::tempdir().unwrap();
    let docs = vec![
        doc_for(codebase.path(), "a.ts", "first document body", NOW_MS, None).await,
        doc_for(
            codebase.path(),
            "b.ts",
            "second document body with more words",
            NOW_MS - 30 * DAY_MS,
            Some((2, 4)),
        )
        .await,
        doc_for(
            codebase.path(),
            "c.ts",
            "third unrelated text",
            NOW_MS - 400 * DAY_MS,
            Some((4, 4)),
        )
        .await,
    ];

    let state = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryVectorStore::new());
    let canonical = codebase.path().canonicalize().unwrap();
    let collection = paths::collection_name(&canonical);
    store.create_collection(&collection, DIMENSION).await.unwrap();
    store.insert(&collection, docs).await.unwrap();
    let context = Context::new(Arc::new(HashEmbedder::new(DIMENSION)), store)
        .with_snapshot(Arc::new(SnapshotManager::at(
            state.path().join("snapshot.json"),
        )))
        .with_clock(Arc::new(FixedClock(NOW_MS)));

    for ranking in [true, false] {
        let response = context
            .semantic_search(
                codebase.path(),
                SearchRequest {
                    query: "document body".to_string(),
                    limit: 10,
                    enable_ranking: Some(ranking),
                    ..SearchRequest::default()
                },
            )
            .await
            .unwrap();
        for result in &response.results {
            assert!(
                (0.0..=1.0).contains(&result.score),
                "score {} out of range (ranking={ranking})",
                result.score
            );
        }
        // Descending order in both modes.
        assert!(response
            .results
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }
}
