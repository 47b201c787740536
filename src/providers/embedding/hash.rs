//! Deterministic hash-based embedding provider
//!
//! Produces unit vectors derived from a content digest. Identical texts map
//! to identical vectors, so tests exercise the full pipeline without a
//! network provider.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::preprocess;
use crate::domain::error::{Error, Result};
use crate::domain::ports::{Embedder, Embedding};

const DEFAULT_DIMENSION: usize = 64;
const DEFAULT_MAX_TOKENS: usize = 512;

/// Content-hash embedding provider for tests and offline use
pub struct HashEmbedder {
    dimension: usize,
    max_tokens: usize,
}

impl HashEmbedder {
    /// Create a provider emitting vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let input = preprocess::preprocess_text(text, self.max_tokens);
        let mut components = Vec::with_capacity(self.dimension);
        let mut counter = 0u32;
        while components.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(input.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for byte in digest {
                if components.len() == self.dimension {
                    break;
                }
                components.push(byte as f32 / 127.5 - 1.0);
            }
            counter += 1;
        }
        let vector = preprocess::normalize(components);
        Embedding {
            dimension: vector.len(),
            vector,
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn detect_dimension(&self, _probe_text: Option<&str>) -> Result<usize> {
        Ok(self.dimension)
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_one(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn dimension(&self) -> Result<usize> {
        Ok(self.dimension)
    }

    fn provider(&self) -> &'static str {
        "hash"
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn batch_size_hint(&self) -> usize {
        128
    }
}

impl HashEmbedder {
    /// Validate construction parameters the way wire providers validate
    /// configuration.
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::internal("embedding dimension must be positive"));
        }
        Ok(Self::new(dimension))
    }
}
