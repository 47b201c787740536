//! Domain port interfaces
//!
//! Boundary contracts between the domain and the provider layer. Each port
//! is a trait-based capability; concrete providers are independent values
//! selected at the configuration boundary.

/// Text embedding capability
pub mod embedding;
/// Vector storage capability
pub mod vector_store;

pub use embedding::{Embedder, Embedding};
pub use vector_store::{
    document_from_row, HybridSearchOptions, QueryRow, SearchOptions, VectorStore,
};
