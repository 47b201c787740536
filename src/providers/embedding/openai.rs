//! OpenAI embedding provider
//!
//! Reference HTTP provider over the `/embeddings` wire contract. Models with
//! publicly known dimensions resolve synchronously; unknown models are
//! probed once and the result is cached until the model is reconfigured.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::preprocess;
use crate::domain::error::{Error, Result};
use crate::domain::ports::{Embedder, Embedding};
use crate::domain::types::EmbeddingConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_TOKENS: usize = 8191;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Published dimensions for well-known models; anything else is probed.
fn known_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    /// Caller-declared dimension; survives model reconfiguration.
    declared_dimension: Option<usize>,
    /// Dimension learned from a probe; cleared on model reconfiguration.
    discovered_dimension: Mutex<Option<usize>>,
    max_tokens: usize,
}

impl OpenAiEmbedder {
    /// Create a provider from its configuration record.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.unwrap_or_default(),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model,
            declared_dimension: config.dimensions,
            discovered_dimension: Mutex::new(None),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    /// Current model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch to a different model. A dimension that was discovered by
    /// probing is forgotten; a caller-declared dimension is kept.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        *self
            .discovered_dimension
            .lock()
            .expect("dimension cache lock poisoned") = None;
    }

    fn cached_dimension(&self) -> Option<usize> {
        self.declared_dimension
            .or_else(|| known_dimension(&self.model))
            .or(*self
                .discovered_dimension
                .lock()
                .expect("dimension cache lock poisoned"))
    }

    /// Issue one `/embeddings` request for an already-preprocessed batch.
    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                Error::provider_unavailable(format!("embedding request failed: {e}"))
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::provider_auth(format!(
                "provider rejected credentials (status {status})"
            )));
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(Error::provider_unavailable(format!(
                "provider returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(Error::internal(format!(
                "provider returned unexpected status {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::invalid_response(format!("malformed JSON body: {e}")))?;

        let data = body["data"]
            .as_array()
            .ok_or_else(|| Error::invalid_response("response lacks a data array"))?;
        if data.len() != inputs.len() {
            return Err(Error::invalid_response(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                data.len()
            )));
        }

        // The wire format carries an index per entry; order by it rather
        // than trusting response order.
        let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
        for entry in data {
            let index = entry["index"].as_u64().unwrap_or(indexed.len() as u64) as usize;
            let vector = entry["embedding"]
                .as_array()
                .ok_or_else(|| Error::invalid_response("entry lacks an embedding array"))?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect::<Vec<f32>>();
            if vector.is_empty() {
                return Err(Error::invalid_response("provider returned an empty vector"));
            }
            indexed.push((index, vector));
        }
        indexed.sort_by_key(|(i, _)| *i);

        Ok(indexed
            .into_iter()
            .map(|(_, vector)| {
                let vector = preprocess::normalize(vector);
                let dimension = vector.len();
                Embedding { vector, dimension }
            })
            .collect())
    }

    fn remember_dimension(&self, dimension: usize) {
        if self.declared_dimension.is_none() && known_dimension(&self.model).is_none() {
            *self
                .discovered_dimension
                .lock()
                .expect("dimension cache lock poisoned") = Some(dimension);
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn detect_dimension(&self, probe_text: Option<&str>) -> Result<usize> {
        if let Some(dimension) = self.cached_dimension() {
            return Ok(dimension);
        }
        let probe = preprocess::preprocess_text(probe_text.unwrap_or("dimension probe"), self.max_tokens);
        let embeddings = self.request_embeddings(&[probe]).await?;
        let dimension = embeddings
            .first()
            .map(|e| e.dimension)
            .ok_or_else(|| Error::invalid_response("probe returned no embedding"))?;
        self.remember_dimension(dimension);
        tracing::debug!(model = %self.model, dimension, "discovered embedding dimension");
        Ok(dimension)
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let input = preprocess::preprocess_text(text, self.max_tokens);
        let mut embeddings = self.request_embeddings(&[input]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| Error::invalid_response("provider returned no embedding"))?;
        self.remember_dimension(embedding.dimension);
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs = preprocess::preprocess_batch(texts, self.max_tokens);
        let embeddings = self.request_embeddings(&inputs).await?;
        if let Some(first) = embeddings.first() {
            self.remember_dimension(first.dimension);
        }
        Ok(embeddings)
    }

    async fn dimension(&self) -> Result<usize> {
        self.detect_dimension(None).await
    }

    fn provider(&self) -> &'static str {
        "openai"
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn batch_size_hint(&self) -> usize {
        64
    }
}
