//! Loader module for the lake indexer ingest.
//!
//! Writes enriched documents to a family's index, either one create call per
//! document or through a batch accumulator flushed with bulk requests.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use serde_json::Value;

use crate::errors::RowError;
use lake_indexer_repository::SearchIndexClient;
use lake_indexer_shared::Document;

/// How a family's documents reach the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// One create call per document.
    PerDocument,
    /// Documents accumulate and are written with bulk requests.
    Batched,
}

/// Configuration for the index loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents per bulk request.
    pub batch_size: usize,
    /// Per-run record cap; drives the progress interval.
    pub record_cap: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            record_cap: 1000,
        }
    }
}

impl LoaderConfig {
    /// Rows between two progress lines.
    pub fn progress_interval(&self) -> usize {
        (self.record_cap / 10).max(1)
    }
}

/// Pending bulk create operations.
///
/// Owned by one loader; never shared across families or runs.
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: usize,
    pending: Vec<Value>,
}

impl BatchAccumulator {
    /// Create an accumulator that is full at `capacity` documents.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            pending: Vec::with_capacity(capacity),
        }
    }

    /// Queue a document. Returns `true` once the batch is full.
    pub fn push(&mut self, document: Value) -> bool {
        self.pending.push(document);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain every queued document.
    pub fn take(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.pending)
    }
}

/// Counters of one loader run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Documents the backend accepted.
    pub written: usize,
    /// Documents rejected inside bulk requests, or carried by a failed request.
    pub rejected: usize,
    /// Bulk requests issued.
    pub flushes: usize,
}

/// Writes documents to one index.
pub struct IndexLoader {
    client: Arc<SearchIndexClient>,
    index: String,
    mode: WriteMode,
    accumulator: BatchAccumulator,
    stats: LoadStats,
}

impl IndexLoader {
    /// Create a loader for `index`.
    pub fn new(
        client: Arc<SearchIndexClient>,
        index: impl Into<String>,
        mode: WriteMode,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            client,
            index: index.into(),
            mode,
            accumulator: BatchAccumulator::new(config.batch_size),
            stats: LoadStats::default(),
        }
    }

    /// Write one document.
    ///
    /// In per-document mode a rejected write is a fault of this row. In
    /// batched mode the document is queued and a full batch is flushed;
    /// bulk failures are counted in the stats instead.
    pub async fn write(&mut self, document: &Document) -> Result<(), RowError> {
        let body = document
            .to_value()
            .map_err(|e| RowError::Serialization(e.to_string()))?;

        match self.mode {
            WriteMode::PerDocument => {
                self.client
                    .create_document(&self.index, &body)
                    .await
                    .map_err(|e| RowError::Write(e.to_string()))?;
                self.stats.written += 1;
            }
            WriteMode::Batched => {
                if self.accumulator.push(body) {
                    self.flush().await;
                }
            }
        }
        Ok(())
    }

    /// Send queued documents with one bulk request.
    ///
    /// Partial failures are logged and counted, not retried.
    #[instrument(skip(self), fields(index = %self.index, count = self.accumulator.len()))]
    pub async fn flush(&mut self) {
        if self.accumulator.is_empty() {
            return;
        }

        let documents = self.accumulator.take();
        let count = documents.len();
        let started = Instant::now();
        self.stats.flushes += 1;

        match self.client.bulk_create(&self.index, &documents).await {
            Ok(summary) => {
                self.stats.written += summary.succeeded;
                self.stats.rejected += summary.failed;
                info!(
                    took_ms = summary.took_ms,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    items = summary.total,
                    errors = summary.errors,
                    "Bulk write completed"
                );
                for failure in summary.failures.iter().take(5) {
                    warn!(
                        position = failure.position,
                        status = failure.status,
                        reason = failure.reason.as_deref().unwrap_or("unknown"),
                        "Bulk item rejected"
                    );
                }
            }
            Err(e) => {
                self.stats.rejected += count;
                error!(error = %e, count = count, "Bulk write failed");
            }
        }
    }

    /// Flush what is left and return the run's counters.
    pub async fn finish(mut self) -> LoadStats {
        self.flush().await;
        debug!(index = %self.index, stats = ?self.stats, "Loader finished");
        self.stats
    }

    /// Counters so far.
    pub fn stats(&self) -> LoadStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryIndex;
    use lake_indexer_shared::{Envelope, VpcFlowRecord};

    fn document(time: i64) -> Document {
        let time_dt = Envelope::format_time(time).unwrap();
        Document::new(Envelope::at(time, time_dt), VpcFlowRecord::default())
            .with_embedding(vec![0.0; 4])
    }

    fn config(batch_size: usize) -> LoaderConfig {
        LoaderConfig {
            batch_size,
            record_cap: 1000,
        }
    }

    #[test]
    fn test_accumulator_fills() {
        let mut acc = BatchAccumulator::new(2);
        assert!(!acc.push(Value::Null));
        assert!(acc.push(Value::Null));
        assert_eq!(acc.take().len(), 2);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_progress_interval() {
        assert_eq!(config(1).progress_interval(), 100);
        let tiny = LoaderConfig {
            batch_size: 1,
            record_cap: 5,
        };
        assert_eq!(tiny.progress_interval(), 1);
    }

    #[tokio::test]
    async fn test_batched_flushes_when_full_and_at_end() {
        let memory = MemoryIndex::new();
        let client = Arc::new(memory.client());
        let mut loader = IndexLoader::new(client, "idx", WriteMode::Batched, &config(2));

        for time in 1..=5 {
            loader.write(&document(time)).await.unwrap();
        }
        assert_eq!(memory.bulk_calls().await, vec![2, 2]);

        let stats = loader.finish().await;
        assert_eq!(memory.bulk_calls().await, vec![2, 2, 1]);
        assert_eq!(stats.written, 5);
        assert_eq!(stats.flushes, 3);
        assert_eq!(memory.documents("idx").await.len(), 5);
    }

    #[tokio::test]
    async fn test_per_document_writes_immediately() {
        let memory = MemoryIndex::new();
        let mut loader =
            IndexLoader::new(Arc::new(memory.client()), "idx", WriteMode::PerDocument, &config(10));

        loader.write(&document(1)).await.unwrap();
        assert_eq!(memory.documents("idx").await.len(), 1);
        assert!(memory.bulk_calls().await.is_empty());

        let stats = loader.finish().await;
        assert_eq!(stats.written, 1);
        assert_eq!(stats.flushes, 0);
    }

    #[tokio::test]
    async fn test_per_document_failure_is_row_error() {
        let memory = MemoryIndex::new();
        memory.fail_writes(true).await;
        let mut loader =
            IndexLoader::new(Arc::new(memory.client()), "idx", WriteMode::PerDocument, &config(10));

        assert!(matches!(
            loader.write(&document(1)).await,
            Err(RowError::Write(_))
        ));
        assert_eq!(loader.stats().written, 0);
    }

    #[tokio::test]
    async fn test_failed_bulk_request_counts_rejected() {
        let memory = MemoryIndex::new();
        memory.fail_writes(true).await;
        let mut loader =
            IndexLoader::new(Arc::new(memory.client()), "idx", WriteMode::Batched, &config(10));

        loader.write(&document(1)).await.unwrap();
        loader.write(&document(2)).await.unwrap();
        let stats = loader.finish().await;

        assert_eq!(stats.written, 0);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.flushes, 1);
    }
}
