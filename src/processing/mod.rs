//! Document processing pipeline: PDF extraction, chunking, embedding, and indexing.

pub mod chunking;
pub mod pdf;
mod service;
pub mod types;

pub use chunking::{ChunkerSettings, TextChunk, chunk_document, chunk_text, reassemble};
pub use service::IngestionService;
pub use types::{
    Chunk, ChunkingError, Document, IngestOutcome, Page, PdfError, ProcessingError,
};
