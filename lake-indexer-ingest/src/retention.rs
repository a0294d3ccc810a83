//! Retention purge.
//!
//! Deletes documents whose `time_dt` is older than the retention boundary,
//! one page of ids at a time. Each page is followed by a cooldown so the
//! next search sees the deletes. Failing pages, including pages where no
//! delete was accepted, are retried in place until too many fail in a row.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use lake_indexer_repository::opensearch::index_config::TIME_DT_FIELD;
use lake_indexer_repository::opensearch::queries::DateBound;
use lake_indexer_repository::{SearchIndexClient, SearchIndexError};

use crate::errors::IngestError;

/// Configuration for the retention purger.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Date expression documents must be older than, e.g. `now-5d/d`.
    pub boundary: String,
    /// Ids fetched and deleted per page.
    pub batch_size: usize,
    /// Pause after every deleted page.
    pub cooldown: Duration,
    /// Pause after a failed page.
    pub exception_backoff: Duration,
    /// Consecutive failed pages after which the purge gives up.
    pub max_consecutive_exceptions: u32,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            boundary: "now-5d/d".to_string(),
            batch_size: 2000,
            cooldown: Duration::from_secs(30),
            exception_backoff: Duration::from_millis(100),
            max_consecutive_exceptions: 10,
        }
    }
}

/// Result of one purge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurgeSummary {
    /// The index did not exist; nothing was done.
    pub skipped: bool,
    /// Document count before the purge started.
    pub doc_count_before: Option<u64>,
    /// Documents older than the boundary before the purge started.
    pub expired_before: Option<u64>,
    /// Hits returned across all pages.
    pub total_matched: usize,
    /// Documents the backend confirmed deleted.
    pub deleted: usize,
    /// Pages deleted.
    pub pages: usize,
    /// Failed pages.
    pub exceptions: u32,
    /// The purge stopped because too many pages failed in a row.
    pub circuit_open: bool,
    pub elapsed: Duration,
}

enum PageOutcome {
    /// Nothing left older than the boundary.
    Empty,
    /// One page deleted.
    Deleted { hits: usize, deleted: usize },
}

/// Removes expired documents from an index.
pub struct RetentionPurger {
    client: Arc<SearchIndexClient>,
    config: PurgeConfig,
}

impl RetentionPurger {
    pub fn new(client: Arc<SearchIndexClient>, config: PurgeConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    /// Purge everything in `index` older than the configured boundary.
    #[instrument(skip(self), fields(boundary = %self.config.boundary))]
    pub async fn purge(&self, index: &str) -> Result<PurgeSummary, IngestError> {
        let mut summary = PurgeSummary::default();
        if !self.client.index_exists(index).await? {
            info!(index = %index, "Index does not exist, nothing to purge");
            summary.skipped = true;
            return Ok(summary);
        }

        let started = Instant::now();
        summary.doc_count_before = self.observe(self.client.count(index).await, "document count");
        summary.expired_before = self.observe(
            self.client
                .count_range(index, TIME_DT_FIELD, DateBound::Before(&self.config.boundary))
                .await,
            "delete range count",
        );
        info!(
            index = %index,
            doc_count = ?summary.doc_count_before,
            expired = ?summary.expired_before,
            "Starting purge"
        );

        let mut consecutive = 0;
        loop {
            match self.purge_page(index).await {
                Ok(PageOutcome::Empty) => {
                    if summary.total_matched == 0 {
                        info!(index = %index, "No documents older than the boundary");
                    } else {
                        info!(index = %index, "No more documents older than the boundary");
                    }
                    break;
                }
                Ok(PageOutcome::Deleted { hits, deleted }) => {
                    consecutive = 0;
                    summary.pages += 1;
                    summary.total_matched += hits;
                    summary.deleted += deleted;
                    info!(
                        index = %index,
                        found = hits,
                        total_deleted = summary.deleted,
                        "Purge page deleted"
                    );

                    tokio::time::sleep(self.config.cooldown).await;
                    if hits < self.config.batch_size {
                        break;
                    }
                }
                Err(e) => {
                    consecutive += 1;
                    summary.exceptions += 1;
                    warn!(
                        index = %index,
                        error = %e,
                        consecutive = consecutive,
                        "Purge page failed"
                    );
                    if consecutive >= self.config.max_consecutive_exceptions {
                        summary.circuit_open = true;
                        error!(index = %index, failures = consecutive, "Giving up on purge");
                        break;
                    }
                    tokio::time::sleep(self.config.exception_backoff).await;
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            index = %index,
            total_matched = summary.total_matched,
            doc_count = ?summary.doc_count_before,
            deleted = summary.deleted,
            minutes = summary.elapsed.as_secs() / 60,
            exceptions = summary.exceptions,
            "Purge finished"
        );
        Ok(summary)
    }

    async fn purge_page(&self, index: &str) -> Result<PageOutcome, SearchIndexError> {
        let page = self
            .client
            .page_older_than(index, TIME_DT_FIELD, &self.config.boundary, self.config.batch_size)
            .await?;
        if page.total_matched == 0 || page.ids.is_empty() {
            return Ok(PageOutcome::Empty);
        }

        let hits = page.ids.len();
        let result = self.client.bulk_delete(index, &page.ids).await?;
        if result.succeeded == 0 {
            return Err(SearchIndexError::bulk_operation(format!(
                "all {} deletes on the page were rejected",
                hits
            )));
        }
        if result.failed > 0 {
            warn!(index = %index, failed = result.failed, "Some deletes were rejected");
        }
        Ok(PageOutcome::Deleted {
            hits,
            deleted: result.succeeded,
        })
    }

    fn observe(&self, count: Result<u64, SearchIndexError>, what: &str) -> Option<u64> {
        match count {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Failed to read {}", what);
                None
            }
        }
    }
}
