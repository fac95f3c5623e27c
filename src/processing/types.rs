//! Core data types and error definitions for the ingestion pipeline.

use crate::{embedding::EmbeddingClientError, qdrant::QdrantError};
use thiserror::Error;

/// Raw text of one source file, split into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier, typically the file stem.
    pub id: String,
    /// Pages in reading order.
    pub pages: Vec<Page>,
}

/// Unit of provenance inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page number as reported by the extractor.
    pub number: u32,
    /// Extracted text of the page.
    pub text: String,
}

impl Document {
    /// Concatenate all page texts with newlines, as sent to the study prompts.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Bounded slice of a page, the unit of embedding and indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk contents.
    pub text: String,
    /// Page the chunk was cut from.
    pub page: u32,
    /// Position of the chunk within its document.
    pub index: usize,
    /// Leading characters repeated from the previous chunk of the same page.
    pub overlap: usize,
}

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible size budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every chunk.
    #[error("chunk overlap {overlap} must be smaller than chunk size {max_chars}")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested maximum chunk length in characters.
        max_chars: usize,
    },
}

/// Errors raised while reading text out of PDF files.
#[derive(Debug, Error)]
pub enum PdfError {
    /// File could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Extraction library rejected the document.
    #[error("failed to extract text from PDF: {0}")]
    Extraction(String),
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// PDF extraction failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Embedding provider failed to produce vectors for the input text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant interaction failed while preparing the collection.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// The document produced no indexable text.
    #[error("No text could be extracted from document {0}")]
    NoText(String),
}

/// Summary of a completed document ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Identifier of the ingested document.
    pub document_id: String,
    /// Number of chunks produced.
    pub chunk_count: usize,
    /// Batches accepted by the vector index.
    pub batches_succeeded: usize,
    /// Batches rejected by the vector index, with their error messages.
    pub failed_batches: Vec<String>,
}

impl IngestOutcome {
    /// Whether every batch of the document reached the index.
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}
