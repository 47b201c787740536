//! Semantic code indexing and retrieval engine
//!
//! Builds vector indexes of codebases (walk, split, embed, persist), keeps
//! them consistent with the filesystem through a content-hash manifest, and
//! serves ranked semantic queries that blend vector similarity with recency,
//! import-frequency and term-frequency signals. The [`Context`] orchestrator
//! is the entry point consumed by outer tool layers.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod providers;

// Re-export the public API surface
pub use application::{Context, IndexOptions, SearchRequest};
pub use domain::error::{Error, Result};
pub use domain::types::*;
