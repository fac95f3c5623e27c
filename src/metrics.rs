//! Counters describing ingestion activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_indexed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_indexed: AtomicU64,
    batches_failed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose chunks were written, and how many batches were rejected.
    pub fn record_document(&self, chunks_written: u64, failed_batches: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunks_written, Ordering::Relaxed);
        self.batches_failed
            .fetch_add(failed_batches, Ordering::Relaxed);
    }

    /// Record a document that could not be processed at all.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents whose chunks reached the index.
    pub documents_indexed: u64,
    /// Documents abandoned before any write, e.g. unreadable PDFs.
    pub documents_failed: u64,
    /// Chunks written across all documents.
    pub chunks_indexed: u64,
    /// Upsert batches rejected by the index.
    pub batches_failed: u64,
}

impl MetricsSnapshot {
    /// Whether nothing went wrong during the run.
    pub fn is_clean(&self) -> bool {
        self.documents_failed == 0 && self.batches_failed == 0
    }
}
