//! Types shared by the answer pipeline.

use crate::{embedding::EmbeddingClientError, qdrant::QdrantError};
use std::fmt;
use thiserror::Error;

/// Result of answering a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Text produced by the language model.
    pub text: String,
    /// Page of each retrieved chunk in similarity order; duplicates are kept.
    pub page_numbers: Vec<u32>,
}

/// Chunk retrieved as context for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// Chunk text as stored in the index.
    pub text: String,
    /// Source page, `0` when the record carries none.
    pub page: u32,
    /// Similarity score reported by the index.
    pub score: f32,
}

/// Lifecycle of one query, used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Query accepted for processing.
    Received,
    /// Computing the query embedding.
    Embedding,
    /// Searching the vector index.
    Searching,
    /// Building the prompt.
    Composing,
    /// Waiting on the language model.
    Generating,
    /// Answer produced.
    Done,
    /// Pipeline aborted.
    Failed,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Received => "received",
            Self::Embedding => "embedding",
            Self::Searching => "searching",
            Self::Composing => "composing",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Failures of the answer pipeline.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Query was empty or whitespace.
    #[error("{0}")]
    InvalidInput(String),
    /// Query embedding could not be computed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index search failed.
    #[error(transparent)]
    Index(#[from] QdrantError),
    /// Language model kept rate limiting after every retry.
    #[error("Language model is rate limited; gave up after {attempts} attempts")]
    UpstreamRateLimited {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// Language model request failed for another reason.
    #[error("Language model request failed: {0}")]
    Upstream(String),
}
