//! Filesystem vector store
//!
//! Durable store rooted at a configurable URI (default
//! `~/.code-context/store`). Each collection is a directory holding
//! `meta.json` (dimension, hybrid flag) and `documents.json` (documents keyed
//! by id, metadata kept as a serialized blob). Writes go through the atomic
//! temp-file + rename helper, and loaded collections are cached per name
//! until dropped.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::filter::FilterExpr;
use super::{cosine_similarity, project_row, rrf_fuse};
use crate::domain::error::{Error, Result};
use crate::domain::ports::{HybridSearchOptions, QueryRow, SearchOptions, VectorStore};
use crate::domain::types::{ScoredDocument, VectorDocument, VectorStoreConfig};
use crate::infrastructure::{fsio, paths};

const META_FILE: &str = "meta.json";
const DOCUMENTS_FILE: &str = "documents.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMeta {
    dimension: usize,
    hybrid: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// On-disk document row; `metadata` stays a serialized blob until the
/// adapter boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    vector: Vec<f32>,
    content: String,
    relative_path: String,
    start_line: u32,
    end_line: u32,
    file_extension: String,
    mtime_ms: i64,
    metadata: String,
}

impl StoredDocument {
    fn from_document(doc: &VectorDocument) -> Result<Self> {
        Ok(Self {
            vector: doc.vector.clone(),
            content: doc.content.clone(),
            relative_path: doc.relative_path.clone(),
            start_line: doc.start_line,
            end_line: doc.end_line,
            file_extension: doc.file_extension.clone(),
            mtime_ms: doc.mtime_ms,
            metadata: serde_json::to_string(&doc.metadata)?,
        })
    }

    fn into_document(self, id: &str) -> VectorDocument {
        let metadata: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&self.metadata).unwrap_or_default();
        VectorDocument {
            id: id.to_string(),
            vector: self.vector,
            content: self.content,
            relative_path: self.relative_path,
            start_line: self.start_line,
            end_line: self.end_line,
            file_extension: self.file_extension,
            mtime_ms: self.mtime_ms,
            metadata,
        }
    }
}

#[derive(Debug)]
struct LoadedCollection {
    meta: CollectionMeta,
    docs: BTreeMap<String, StoredDocument>,
}

/// Filesystem-backed vector store provider
pub struct FilesystemVectorStore {
    root: PathBuf,
    max_collections: usize,
    handles: DashMap<String, Arc<RwLock<LoadedCollection>>>,
}

impl FilesystemVectorStore {
    /// Open (creating if needed) a store rooted at the configured URI.
    pub async fn open(config: &VectorStoreConfig) -> Result<Self> {
        let root = config
            .uri
            .as_deref()
            .map(paths::expand_uri)
            .unwrap_or_else(paths::default_store_root);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::unavailable(format!("cannot create store root: {e}")))?;
        Ok(Self {
            root,
            max_collections: config.max_collections,
            handles: DashMap::new(),
        })
    }

    /// Open a store rooted at an explicit directory (tests, tools).
    pub async fn open_at(root: impl Into<PathBuf>, max_collections: usize) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| Error::unavailable(format!("cannot create store root: {e}")))?;
        Ok(Self {
            root,
            max_collections,
            handles: DashMap::new(),
        })
    }

    fn collection_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::internal(format!("invalid collection name: {name}")));
        }
        Ok(self.root.join(name))
    }

    async fn ensure_ready(&self) -> Result<()> {
        if tokio::fs::metadata(&self.root).await.is_err() {
            return Err(Error::unavailable(format!(
                "store root missing: {}",
                self.root.display()
            )));
        }
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Arc<RwLock<LoadedCollection>>> {
        if let Some(handle) = self.handles.get(name) {
            return Ok(handle.clone());
        }

        let dir = self.collection_dir(name)?;
        let meta_path = dir.join(META_FILE);
        if tokio::fs::metadata(&meta_path).await.is_err() {
            return Err(Error::not_found(format!("collection {name}")));
        }
        let meta: CollectionMeta = read_json(&meta_path).await?;
        let docs: BTreeMap<String, StoredDocument> = read_json(&dir.join(DOCUMENTS_FILE)).await?;

        let handle = Arc::new(RwLock::new(LoadedCollection { meta, docs }));
        self.handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    async fn create_with_flags(&self, name: &str, dimension: usize, hybrid: bool) -> Result<()> {
        self.ensure_ready().await?;
        let dir = self.collection_dir(name)?;
        if tokio::fs::metadata(dir.join(META_FILE)).await.is_ok() {
            return Ok(());
        }
        let existing = self.list_collections().await?;
        if existing.len() >= self.max_collections {
            return Err(Error::collection_limit(format!(
                "store holds {} of {} collections",
                existing.len(),
                self.max_collections
            )));
        }
        let meta = CollectionMeta {
            dimension,
            hybrid,
            created_at: chrono::Utc::now(),
        };
        fsio::write_json_atomic(&dir.join(META_FILE), &meta).await?;
        fsio::write_json_atomic(
            &dir.join(DOCUMENTS_FILE),
            &BTreeMap::<String, StoredDocument>::new(),
        )
        .await?;
        tracing::debug!(collection = name, dimension, hybrid, "created collection");
        Ok(())
    }

    async fn persist_documents(
        &self,
        name: &str,
        docs: &BTreeMap<String, StoredDocument>,
    ) -> Result<()> {
        let dir = self.collection_dir(name)?;
        fsio::write_json_atomic(&dir.join(DOCUMENTS_FILE), docs).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::unavailable(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl VectorStore for FilesystemVectorStore {
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        self.create_with_flags(name, dimension, false).await
    }

    async fn create_hybrid_collection(&self, name: &str, dimension: usize) -> Result<()> {
        self.create_with_flags(name, dimension, true).await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.ensure_ready().await?;
        self.handles.remove(name);
        let dir = self.collection_dir(name)?;
        if tokio::fs::metadata(dir.join(META_FILE)).await.is_err() {
            return Err(Error::not_found(format!("collection {name}")));
        }
        tokio::fs::remove_dir_all(&dir).await?;
        tracing::debug!(collection = name, "dropped collection");
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.ensure_ready().await?;
        let dir = self.collection_dir(name)?;
        Ok(tokio::fs::metadata(dir.join(META_FILE)).await.is_ok())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.ensure_ready().await?;
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::unavailable(format!("cannot list store root: {e}")))?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if tokio::fs::metadata(entry.path().join(META_FILE)).await.is_ok() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn insert(&self, name: &str, documents: Vec<VectorDocument>) -> Result<()> {
        self.ensure_ready().await?;
        let handle = self.load(name).await?;
        let mut collection = handle.write().await;

        for doc in &documents {
            if doc.vector.len() != collection.meta.dimension {
                return Err(Error::DimensionMismatch {
                    expected: collection.meta.dimension,
                    actual: doc.vector.len(),
                });
            }
        }

        // Stage the batch on a copy so a failed persist leaves both the
        // cache and the segment file untouched.
        let mut staged = collection.docs.clone();
        for doc in &documents {
            staged.insert(doc.id.clone(), StoredDocument::from_document(doc)?);
        }
        self.persist_documents(name, &staged).await?;
        collection.docs = staged;
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredDocument>> {
        self.ensure_ready().await?;
        let filter = options
            .filter_expr
            .as_deref()
            .map(FilterExpr::parse)
            .transpose()?;
        let handle = self.load(name).await?;
        let collection = handle.read().await;
        if query_vector.len() != collection.meta.dimension {
            return Err(Error::DimensionMismatch {
                expected: collection.meta.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<ScoredDocument> = collection
            .docs
            .iter()
            .map(|(id, stored)| stored.clone().into_document(id))
            .filter(|doc| filter.as_ref().map(|f| f.matches(doc)).unwrap_or(true))
            .map(|doc| ScoredDocument {
                score: cosine_similarity(query_vector, &doc.vector),
                document: doc,
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
        self.ensure_ready().await?;
        let filter = FilterExpr::parse(filter_expr)?;
        let handle = self.load(name).await?;
        let collection = handle.read().await;

        let mut rows = Vec::new();
        for (id, stored) in &collection.docs {
            let doc = stored.clone().into_document(id);
            if !filter.matches(&doc) {
                continue;
            }
            rows.push(project_row(&doc, output_fields));
            if let Some(limit) = limit {
                if rows.len() == limit {
                    break;
                }
            }
        }
        Ok(rows)
    }

    async fn delete(&self, name: &str, ids: &[String]) -> Result<()> {
        self.ensure_ready().await?;
        let handle = self.load(name).await?;
        let mut collection = handle.write().await;

        let mut staged = collection.docs.clone();
        let mut removed = false;
        for id in ids {
            removed |= staged.remove(id).is_some();
        }
        if removed {
            self.persist_documents(name, &staged).await?;
            collection.docs = staged;
        }
        Ok(())
    }
}
