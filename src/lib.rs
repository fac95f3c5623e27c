#![deny(missing_docs)]

//! Core library of the Echo study services: retrieval-augmented question answering over
//! indexed PDFs, plus PDF-to-notes and PDF-to-flashcards generation.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Chat-completion clients and rate-limit backoff.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Retrieval-augmented answering.
pub mod rag;
/// Listener helpers for the HTTP binaries.
pub mod server;
/// Study notes and flashcards.
pub mod study;
