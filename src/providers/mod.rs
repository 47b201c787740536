//! Provider layer
//!
//! Concrete implementations of the domain ports, selected at the
//! configuration boundary through the factory functions re-exported here.

/// Embedding providers
pub mod embedding;
/// Vector store providers
pub mod vector_store;

pub use embedding::{create_embedder, HashEmbedder, OpenAiEmbedder};
pub use vector_store::{create_vector_store, FilesystemVectorStore, MemoryVectorStore};
