//! Embedding providers
//!
//! Concrete implementations of the [`Embedder`](crate::domain::ports::Embedder)
//! capability. All providers route inputs through the shared
//! [`preprocess`] rules before any wire call.

pub mod hash;
pub mod openai;
pub mod preprocess;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;

use std::sync::Arc;

use crate::domain::error::{Error, Result};
use crate::domain::ports::Embedder;
use crate::domain::types::EmbeddingConfig;

/// Instantiate a provider from its configuration record.
pub fn create_embedder(config: EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "hash" => Ok(Arc::new(HashEmbedder::with_dimension(
            config.dimensions.unwrap_or(64),
        )?)),
        other => Err(Error::internal(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}
