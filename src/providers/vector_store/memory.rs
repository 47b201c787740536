//! In-memory vector store
//!
//! Collection-oriented store backed by process memory. Used by the test
//! suite and for ephemeral indexes; implements the full store contract
//! including filters and batch-atomic inserts.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::filter::FilterExpr;
use super::{cosine_similarity, project_row, rrf_fuse};
use crate::domain::error::{Error, Result};
use crate::domain::ports::{HybridSearchOptions, QueryRow, SearchOptions, VectorStore};
use crate::domain::types::{ScoredDocument, VectorDocument};

#[derive(Debug)]
struct MemoryCollection {
    dimension: usize,
    docs: BTreeMap<String, VectorDocument>,
}

/// In-memory vector store provider
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: DashMap<String, MemoryCollection>,
}

impl MemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_filter(filter_expr: Option<&str>) -> Result<Option<FilterExpr>> {
        filter_expr.map(FilterExpr::parse).transpose()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection {
                dimension,
                docs: BTreeMap::new(),
            });
        Ok(())
    }

    async fn create_hybrid_collection(&self, name: &str, dimension: usize) -> Result<()> {
        // The in-memory store scans content directly; the term index is a
        // property of the durable providers.
        self.create_collection(name, dimension).await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("collection {name}")))
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn insert(&self, name: &str, documents: Vec<VectorDocument>) -> Result<()> {
        let mut collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("collection {name}")))?;

        // Validate the whole batch before touching the collection so a
        // failure leaves no partial write.
        for doc in &documents {
            if doc.vector.len() != collection.dimension {
                return Err(Error::DimensionMismatch {
                    expected: collection.dimension,
                    actual: doc.vector.len(),
                });
            }
        }
        for doc in documents {
            collection.docs.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredDocument>> {
        let filter = Self::parse_filter(options.filter_expr.as_deref())?;
        let collection = self
            .collections
            .get(name)
            .ok_or_else(|| Error::not_found(format!("collection {name}")))?;
        if query_vector.len() != collection.dimension {
            return Err(Error::DimensionMismatch {
                expected: collection.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<ScoredDocument> = collection
            .docs
            .values()
            .filter(|doc| filter.as_ref().map(|f| f.matches(doc)).unwrap_or(true))
            .map(|doc| ScoredDocument {
                score: cosine_similarity(query_vector, &doc.vector),
                document: doc.clone(),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        scored.truncate(options.top_k);
        Ok(scored)
    }

    async fn hybrid_search(
        &self,
        name: &str,
        query_vectors: &[Vec<f32>],
        options: &HybridSearchOptions,
    ) -> Result<Vec<ScoredDocument>> {
        let per_vector = SearchOptions {
            top_k: options.limit,
            filter_expr: options.filter_expr.clone(),
        };
        let lists = futures::future::try_join_all(
            query_vectors
                .iter()
                .map(|query| self.search(name, query, &per_vector)),
        )
        .await?;
        Ok(rrf_fuse(lists, options.limit))
    }

    async fn query(
        &self,
        name: &str,
        filter_expr: &str,
        output_fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<QueryRow>> {
        let filter = FilterExpr::parse(filter_expr)?;
        let collection = self
            .collections
            .get(name)
            .ok_or_else(|| Error::not_found(format!("collection {name}")))?;

        let mut rows = Vec::new();
        for doc in collection.docs.values() {
            if !filter.matches(doc) {
                continue;
            }
            rows.push(project_row(doc, output_fields));
            if let Some(limit) = limit {
                if rows.len() == limit {
                    break;
                }
            }
        }
        Ok(rows)
    }

    async fn delete(&self, name: &str, ids: &[String]) -> Result<()> {
        let mut collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("collection {name}")))?;
        for id in ids {
            collection.docs.remove(id);
        }
        Ok(())
    }
}
