//! Vector store providers
//!
//! Two implementations of the [`VectorStore`] port: an in-memory store for
//! tests and ephemeral use, and a filesystem store persisting one directory
//! per collection. Shared pieces live here: cosine scoring, result-row
//! projection, and Reciprocal-Rank Fusion for hybrid search.

pub mod filesystem;
pub mod filter;
pub mod memory;

pub use filesystem::FilesystemVectorStore;
pub use filter::FilterExpr;
pub use memory::MemoryVectorStore;

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::domain::ports::{QueryRow, VectorStore};
use crate::domain::types::{ScoredDocument, VectorDocument};

/// RRF smoothing constant: fused score is `Σ 1/(60 + rank)`.
const RRF_K: f32 = 60.0;

/// Cosine similarity clamped to `[0, 1]`.
///
/// Providers emit unit-normalized vectors, so the dot product is the cosine;
/// negative correlations clamp to zero to keep store scores in range.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot.clamp(0.0, 1.0)
}

/// Fuse per-vector result lists with Reciprocal-Rank Fusion.
///
/// Each candidate accumulates `1/(60 + rank)` per list it appears in (ranks
/// are 1-based), duplicates are merged by document id, and the fused list is
/// sorted by descending score and truncated to `limit`.
pub(crate) fn rrf_fuse(lists: Vec<Vec<ScoredDocument>>, limit: usize) -> Vec<ScoredDocument> {
    let mut fused: BTreeMap<String, (VectorDocument, f32)> = BTreeMap::new();
    for list in lists {
        for (rank, item) in list.into_iter().enumerate() {
            let contribution = 1.0 / (RRF_K + rank as f32 + 1.0);
            fused
                .entry(item.document.id.clone())
                .and_modify(|(_, score)| *score += contribution)
                .or_insert((item.document, contribution));
        }
    }
    fused
        .into_values()
        .map(|(document, score)| ScoredDocument { document, score })
        .sorted_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        })
        .take(limit)
        .collect()
}

/// Project a document onto the requested output fields.
///
/// An empty field list selects every field. `metadata` is always emitted as
/// a parsed JSON object.
pub(crate) fn project_row(doc: &VectorDocument, output_fields: &[&str]) -> QueryRow {
    let all = output_fields.is_empty();
    let wants = |name: &str| all || output_fields.contains(&name);

    let mut row = QueryRow::new();
    if wants("id") {
        row.insert("id".to_string(), serde_json::json!(doc.id));
    }
    if wants("vector") {
        row.insert("vector".to_string(), serde_json::json!(doc.vector));
    }
    if wants("content") {
        row.insert("content".to_string(), serde_json::json!(doc.content));
    }
    if wants("relative_path") {
        row.insert(
            "relative_path".to_string(),
            serde_json::json!(doc.relative_path),
        );
    }
    if wants("start_line") {
        row.insert("start_line".to_string(), serde_json::json!(doc.start_line));
    }
    if wants("end_line") {
        row.insert("end_line".to_string(), serde_json::json!(doc.end_line));
    }
    if wants("file_extension") {
        row.insert(
            "file_extension".to_string(),
            serde_json::json!(doc.file_extension),
        );
    }
    if wants("mtime_ms") {
        row.insert("mtime_ms".to_string(), serde_json::json!(doc.mtime_ms));
    }
    if wants("metadata") {
        row.insert(
            "metadata".to_string(),
            serde_json::Value::Object(
                doc.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        );
    }
    row
}

/// Instantiate a store from its configuration record.
pub async fn create_vector_store(
    config: &crate::domain::types::VectorStoreConfig,
) -> crate::domain::error::Result<std::sync::Arc<dyn VectorStore>> {
    match config.provider.as_str() {
        "memory" | "in-memory" => Ok(std::sync::Arc::new(MemoryVectorStore::new())),
        "filesystem" => Ok(std::sync::Arc::new(
            FilesystemVectorStore::open(config).await?,
        )),
        other => Err(crate::domain::error::Error::internal(format!(
            "unknown vector store provider: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> ScoredDocument {
        ScoredDocument {
            score: 0.5,
            document: VectorDocument {
                id: id.to_string(),
                vector: vec![1.0],
                content: String::new(),
                relative_path: format!("{id}.rs"),
                start_line: 1,
                end_line: 2,
                file_extension: "rs".to_string(),
                mtime_ms: 0,
                metadata: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn single_list_preserves_ordering() {
        let list = vec![doc("a"), doc("b"), doc("c")];
        let fused = rrf_fuse(vec![list.clone()], 10);
        let ids: Vec<&str> = fused.iter().map(|d| d.document.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn disjoint_lists_merge_into_superset() {
        let left = vec![doc("a"), doc("b")];
        let right = vec![doc("c"), doc("d")];
        let fused = rrf_fuse(vec![left, right], 10);
        let ids: Vec<&str> = fused.iter().map(|d| d.document.id.as_str()).collect();
        assert_eq!(fused.len(), 4);
        for id in ["a", "b", "c", "d"] {
            assert!(ids.contains(&id));
        }
    }

    #[test]
    fn duplicates_accumulate_and_rank_first() {
        let left = vec![doc("a"), doc("b")];
        let right = vec![doc("b"), doc("c")];
        let fused = rrf_fuse(vec![left, right], 10);
        assert_eq!(fused[0].document.id, "b");
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn fusion_truncates_to_limit() {
        let list = vec![doc("a"), doc("b"), doc("c")];
        assert_eq!(rrf_fuse(vec![list], 2).len(), 2);
    }
}
