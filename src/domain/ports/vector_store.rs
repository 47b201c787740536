//! Vector storage capability

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::error::Result;
use crate::domain::types::{ScoredDocument, VectorDocument};

/// A projected row returned by [`VectorStore::query`]
///
/// Holds exactly the requested output fields; `metadata` is always present
/// as a parsed JSON object, never as a serialized blob.
pub type QueryRow = BTreeMap<String, serde_json::Value>;

/// Options for approximate-nearest-neighbor search
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of results
    pub top_k: usize,
    /// Optional scalar predicate over persisted fields
    pub filter_expr: Option<String>,
}

/// Options for multi-vector hybrid search
#[derive(Debug, Clone, Default)]
pub struct HybridSearchOptions {
    /// Maximum number of fused results
    pub limit: usize,
    /// Optional scalar predicate over persisted fields
    pub filter_expr: Option<String>,
}

/// Collection-oriented vector persistence
///
/// All documents within a collection carry vectors of the dimension fixed at
/// collection creation; inserting a differing vector fails with
/// `DimensionMismatch` before anything is written. Batched operations
/// succeed or fail as a whole.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection; an existing collection of the same name is kept.
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Create a collection with an additional term index over `content`.
    async fn create_hybrid_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Drop a collection; fails with `NotFound` when absent.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// True when a collection with this name exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Names of all collections in the store.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Batched upsert keyed by document id.
    async fn insert(&self, name: &str, documents: Vec<VectorDocument>) -> Result<()>;

    /// Approximate-nearest-neighbor search, ordered by descending
    /// similarity, at most `top_k` results.
    async fn search(
        &self,
        name: &str,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredDocument>>;

    /// Fuse per-vector result lists with Reciprocal-Rank Fusion
    /// (`score = Σ 1/(60 + rank)`), deduplicated by id and truncated to the
    /// configured limit.
    async fn hybrid_search(
        &self,
        name: &str,
        query_vectors: &[Vec<f32>],
        options: &HybridSearchOptions,
    ) -> Result<Vec<ScoredDocument>>;

    /// Scalar query with field projection.
    async fn query(
        &self,
        name: &str,
        filter_expr: &str,
        output_fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<QueryRow>>;

    /// Delete documents by id; absent ids are ignored. Fails only when the
    /// collection itself is missing.
    async fn delete(&self, name: &str, ids: &[String]) -> Result<()>;
}

/// Reconstruct a document from a row projected with every field.
///
/// Used by passes that read documents back to refresh their metadata;
/// returns `None` when a field is missing or mistyped.
pub fn document_from_row(row: &QueryRow) -> Option<VectorDocument> {
    Some(VectorDocument {
        id: row.get("id")?.as_str()?.to_string(),
        vector: row
            .get("vector")?
            .as_array()?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect(),
        content: row.get("content")?.as_str()?.to_string(),
        relative_path: row.get("relative_path")?.as_str()?.to_string(),
        start_line: row.get("start_line")?.as_u64()? as u32,
        end_line: row.get("end_line")?.as_u64()? as u32,
        file_extension: row.get("file_extension")?.as_str()?.to_string(),
        mtime_ms: row.get("mtime_ms")?.as_i64()?,
        metadata: row
            .get("metadata")?
            .as_object()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}
