//! Embedding capability

use async_trait::async_trait;

use crate::domain::error::Result;

/// Dense vector produced by an embedding provider
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Unit-normalized vector values
    pub vector: Vec<f32>,
    /// Dimensionality of the vector
    pub dimension: usize,
}

/// Capability turning text into fixed-dimension unit-normalized vectors
///
/// Implementations apply the shared preprocessing contract before any wire
/// call: the empty string becomes a single space and inputs longer than
/// `max_tokens() * 4` characters are truncated to exactly that length.
/// Batch calls are atomic: either every input embeds or the call fails.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Resolve the output dimension, probing the provider when the model is
    /// not publicly known. The probe result is cached.
    async fn detect_dimension(&self, probe_text: Option<&str>) -> Result<usize>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts; the output sequence has the same length and
    /// order as the input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// The declared or previously discovered output dimension.
    async fn dimension(&self) -> Result<usize>;

    /// Stable provider identifier (e.g. `openai`).
    fn provider(&self) -> &'static str;

    /// Maximum input tokens the provider accepts per text.
    fn max_tokens(&self) -> usize;

    /// Preferred number of texts per batch call.
    fn batch_size_hint(&self) -> usize {
        32
    }

    /// Declared cap on concurrent in-flight requests.
    fn max_concurrent_requests(&self) -> usize {
        4
    }
}
