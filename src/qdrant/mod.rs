//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::{QdrantService, UPSERT_BATCH_SIZE, VectorIndex};
pub use filters::build_namespace_filter;
pub use types::{BatchOutcome, IndexRecord, QdrantError, ScoredPoint, UpsertReport};
