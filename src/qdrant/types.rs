//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Persisted unit of the index: identifier, vector, and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Caller-chosen unique identifier, e.g. `lecture-3_12`.
    pub id: String,
    /// Embedding vector of the chunk.
    pub vector: Vec<f32>,
    /// Metadata stored as the point payload; carries at least `page` and `chunk_text`.
    pub metadata: Map<String, Value>,
}

/// Scored payload returned by similarity queries, best match first.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Payload associated with the vector.
    pub payload: Map<String, Value>,
}

/// Result of sending one batch of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Zero-based batch position.
    pub batch: usize,
    /// Records contained in the batch.
    pub records: usize,
    /// Failure description when Qdrant rejected the batch.
    pub error: Option<String>,
}

/// Per-batch report of an upsert. Batches are independent; a failed batch is not rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Outcomes in transmission order.
    pub batches: Vec<BatchOutcome>,
}

impl UpsertReport {
    /// Whether every batch was accepted.
    pub fn is_success(&self) -> bool {
        self.batches.iter().all(|batch| batch.error.is_none())
    }

    /// Number of records inside accepted batches.
    pub fn records_written(&self) -> usize {
        self.batches
            .iter()
            .filter(|batch| batch.error.is_none())
            .map(|batch| batch.records)
            .sum()
    }

    /// Error messages of rejected batches.
    pub fn failures(&self) -> Vec<String> {
        self.batches
            .iter()
            .filter_map(|batch| {
                batch
                    .error
                    .as_ref()
                    .map(|error| format!("batch {}: {error}", batch.batch))
            })
            .collect()
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
