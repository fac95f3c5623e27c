//! Query orchestration: embed → search → compose → generate.

use crate::{
    config::Config,
    embedding::EmbeddingClient,
    llm::{ChatMessage, ChatModel, ChatRequest, LlmError},
    qdrant::{
        VectorIndex,
        payload::{chunk_text, page_number},
    },
    rag::{
        prompt::{compose, join_context},
        types::{Answer, AnswerError, QueryStage, RetrievedChunk},
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Abstraction over the answer pipeline used by the HTTP surface.
#[async_trait]
pub trait AnswerApi: Send + Sync {
    /// Answer a raw user query.
    async fn answer(&self, query: &str) -> Result<Answer, AnswerError>;
}

/// Tunables for answering queries.
#[derive(Debug, Clone)]
pub struct AnswerSettings {
    /// Namespace searched for context.
    pub namespace: String,
    /// Nearest neighbours retrieved per query.
    pub top_k: usize,
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap.
    pub max_tokens: u32,
}

impl AnswerSettings {
    /// Settings derived from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.index_namespace.clone(),
            top_k: config.retrieval_top_k,
            model: config.chat_model.clone(),
            temperature: 0.5,
            max_tokens: 1024,
        }
    }
}

/// Retrieval-augmented answer service.
///
/// All collaborators are constructed once at startup and injected here; the service itself
/// holds no mutable state and can be shared across requests through an `Arc`.
pub struct AnswerService {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn ChatModel>,
    settings: AnswerSettings,
}

impl AnswerService {
    /// Wire the service from its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn ChatModel>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            model,
            settings,
        }
    }

    /// Run the full pipeline for one query.
    pub async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        let mut stage = QueryStage::Received;
        let result = self.run(query, &mut stage).await;
        match &result {
            Ok(answer) => tracing::debug!(
                stage = %QueryStage::Done,
                pages = ?answer.page_numbers,
                "Query answered"
            ),
            Err(error) => tracing::warn!(
                stage = %QueryStage::Failed,
                failed_in = %stage,
                error = %error,
                "Query failed"
            ),
        }
        result
    }

    async fn run(&self, query: &str, stage: &mut QueryStage) -> Result<Answer, AnswerError> {
        if query.trim().is_empty() {
            return Err(AnswerError::InvalidInput("Query cannot be empty".into()));
        }

        advance(stage, QueryStage::Embedding);
        let vector = self.embedder.embed(query).await?;

        advance(stage, QueryStage::Searching);
        let retrieved = self.retrieve(vector).await?;

        advance(stage, QueryStage::Composing);
        let texts: Vec<&str> = retrieved.iter().map(|chunk| chunk.text.as_str()).collect();
        let prompt = compose(&join_context(&texts), query);

        advance(stage, QueryStage::Generating);
        let text = self
            .model
            .complete(ChatRequest {
                model: self.settings.model.clone(),
                messages: vec![ChatMessage::user(prompt)],
                temperature: Some(self.settings.temperature),
                max_tokens: Some(self.settings.max_tokens),
            })
            .await
            .map_err(|error| match error {
                LlmError::RateLimited { attempts } => AnswerError::UpstreamRateLimited { attempts },
                other => AnswerError::Upstream(other.to_string()),
            })?;

        Ok(Answer {
            text,
            page_numbers: retrieved.iter().map(|chunk| chunk.page).collect(),
        })
    }

    /// Nearest chunks for a query vector; an empty result is not an error.
    async fn retrieve(&self, vector: Vec<f32>) -> Result<Vec<RetrievedChunk>, AnswerError> {
        let hits = self
            .index
            .search(vector, self.settings.top_k, &self.settings.namespace)
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                text: chunk_text(&hit.payload),
                page: page_number(&hit.payload),
                score: hit.score,
            })
            .collect())
    }
}

fn advance(stage: &mut QueryStage, next: QueryStage) {
    tracing::debug!(stage = %next, previous = %stage, "Query stage");
    *stage = next;
}

#[async_trait]
impl AnswerApi for AnswerService {
    async fn answer(&self, query: &str) -> Result<Answer, AnswerError> {
        AnswerService::answer(self, query).await
    }
}
