//! Embedding clients.
//!
//! One client is built per process by [`build_embedding_client`], warmed with one request,
//! and shared behind an `Arc`. Clients hold no mutable state, so concurrent requests may embed
//! through the same instance.

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const WARMUP_TEXT: &str = "warm-up";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider could not be reached or returned an error status.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Vector length differs from the configured collection dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the collection.
        expected: usize,
        /// Dimension returned by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.generate_embeddings(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("provider returned no vectors".into())
            })
    }
}

/// Build the configured embedding client and verify it produces vectors of the right size.
///
/// Any failure here is fatal: the caller should abort startup rather than serve traffic
/// without a working model.
pub async fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    let client: Arc<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.embedding_model,
        )?),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbeddingClient::new(config.embedding_dimension)),
    };

    tracing::info!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        "Warming up embedding model"
    );
    let warmup = client.embed(WARMUP_TEXT).await?;
    if warmup.len() != config.embedding_dimension {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: config.embedding_dimension,
            actual: warmup.len(),
        });
    }
    tracing::info!(dimension = warmup.len(), "Embedding model ready");
    Ok(client)
}

/// Embeddings served by an Ollama runtime through `POST /api/embed`.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Construct a client for the given runtime URL and model.
    pub fn new(base_url: &str, model: &str) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("echo-study/embed")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| EmbeddingClientError::ProviderUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        tracing::debug!(model = %self.model, inputs = expected, "Requesting embeddings");

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::ProviderUnavailable(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if body.embeddings.len() != expected {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {expected} vectors, received {}",
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings)
    }
}

/// Deterministic in-process embedder that folds bytes into a normalised vector.
///
/// Useful offline and in tests; it carries no semantic meaning.
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct an embedder producing vectors of `dimension` floats.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = (idx.wrapping_mul(31) ^ usize::from(byte)) % self.dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}
