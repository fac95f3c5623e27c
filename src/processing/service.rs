//! Ingestion service coordinating chunking, embedding, and index writes.

use crate::{
    embedding::EmbeddingClient,
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        chunking::{ChunkerSettings, chunk_document},
        pdf::load_document,
        types::{Chunk, Document, IngestOutcome, ProcessingError},
    },
    qdrant::{IndexRecord, VectorIndex, payload::chunk_metadata},
};
use std::path::Path;
use std::sync::Arc;

/// Texts sent to the embedding provider per request.
const EMBED_BATCH_SIZE: usize = 64;

/// Turns documents into indexed chunks: chunk, embed, then upsert.
///
/// Construct once per process and share; counters accumulate across documents.
pub struct IngestionService {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    chunker: ChunkerSettings,
    namespace: String,
    metrics: IngestMetrics,
}

impl IngestionService {
    /// Wire the service from its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        chunker: ChunkerSettings,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            chunker,
            namespace: namespace.into(),
            metrics: IngestMetrics::new(),
        }
    }

    /// Namespace records are written into.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Extract a PDF from disk and ingest it as document `id`.
    pub async fn ingest_pdf(
        &self,
        path: &Path,
        id: &str,
    ) -> Result<IngestOutcome, ProcessingError> {
        let document = load_document(path, id).await.inspect_err(|error| {
            self.metrics.record_failure();
            tracing::error!(path = %path.display(), error = %error, "Failed to read PDF");
        })?;
        self.ingest_document(&document).await
    }

    /// Chunk, embed, and index one document.
    ///
    /// A document without any non-blank text is rejected as [`ProcessingError::NoText`].
    /// Embedding failures abort the document before anything is written. Upsert batches are
    /// independent: rejected batches are reported in the outcome, not rolled back.
    pub async fn ingest_document(
        &self,
        document: &Document,
    ) -> Result<IngestOutcome, ProcessingError> {
        let chunks = chunk_document(document, self.chunker);
        tracing::info!(
            document = %document.id,
            pages = document.pages.len(),
            chunks = chunks.len(),
            "Ingesting document"
        );
        if chunks.is_empty() {
            self.metrics.record_failure();
            tracing::warn!(document = %document.id, "Document has no extractable text");
            return Err(ProcessingError::NoText(document.id.clone()));
        }

        let vectors = match self.embed_chunks(&chunks).await {
            Ok(vectors) => vectors,
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(document = %document.id, error = %error, "Embedding failed");
                return Err(error);
            }
        };

        let records = build_records(&document.id, &chunks, vectors);
        let report = self.index.upsert(&self.namespace, records).await;
        let failed_batches = report.failures();
        let batches_succeeded = report.batches.len() - failed_batches.len();

        self.metrics.record_document(
            report.records_written() as u64,
            failed_batches.len() as u64,
        );
        if failed_batches.is_empty() {
            tracing::info!(
                document = %document.id,
                records = report.records_written(),
                batches = batches_succeeded,
                "Indexed document"
            );
        } else {
            tracing::warn!(
                document = %document.id,
                failed = failed_batches.len(),
                succeeded = batches_succeeded,
                "Document partially indexed"
            );
        }

        Ok(IngestOutcome {
            document_id: document.id.clone(),
            chunk_count: chunks.len(),
            batches_succeeded,
            failed_batches,
        })
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, ProcessingError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|chunk| chunk.text.clone()).collect();
            vectors.extend(self.embedder.generate_embeddings(texts).await?);
        }
        if vectors.len() != chunks.len() {
            return Err(ProcessingError::Embedding(
                crate::embedding::EmbeddingClientError::GenerationFailed(format!(
                    "expected {} vectors, got {}",
                    chunks.len(),
                    vectors.len()
                )),
            ));
        }
        Ok(vectors)
    }
}

/// Pair chunks with their vectors; ids are `{document}_{chunk index}` so re-ingestion overwrites.
fn build_records(document_id: &str, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Vec<IndexRecord> {
    chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexRecord {
            id: format!("{document_id}_{}", chunk.index),
            vector,
            metadata: chunk_metadata(document_id, chunk.page, chunk.index, &chunk.text),
        })
        .collect()
}
