//! Orchestrator module for the lake indexer ingest.
//!
//! Runs every configured family in turn: purge, then one watermark-driven
//! ingest window (extract, map, enrich, index). A family's failure is
//! logged and recorded in its report; the next family runs regardless.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use lake_indexer_repository::opensearch::index_config::TIME_DT_FIELD;
use lake_indexer_repository::opensearch::queries::DateBound;
use lake_indexer_repository::SearchIndexClient;
use lake_indexer_shared::{Family, RawRow, Watermark};

use crate::consumer::{ExtractionOutcome, ExtractionRunner, ResultReader, ResultSet};
use crate::errors::{IngestError, RowError};
use crate::lifecycle::IndexLifecycle;
use crate::loader::{IndexLoader, LoaderConfig};
use crate::processor::{family_profile, EmbeddingEnricher, TelemetryFamily};
use crate::retention::{PurgeSummary, RetentionPurger};
use crate::watermark::WatermarkResolver;

/// Prefix shared by the telemetry indices in listings.
pub const INDEX_LISTING_PREFIX: &str = "security";

/// Date expression for "since local start of today" in listings.
const TODAY: &str = "now-0d/d";

/// One family to run: where it is read from and where it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyTarget {
    pub family: Family,
    /// Destination index.
    pub index: String,
    /// Source table in the query engine's database.
    pub table: String,
}

impl FamilyTarget {
    pub fn new(family: Family, index: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            family,
            index: index.into(),
            table: table.into(),
        }
    }

    /// Profile of the target's family.
    pub fn profile(&self) -> &'static dyn TelemetryFamily {
        family_profile(self.family)
    }
}

/// Restrict `targets` to the one named by `selector`.
///
/// The selector matches an index name or a datasource key. Without a
/// selector, or when nothing matches, every target runs.
pub fn select_targets(targets: Vec<FamilyTarget>, selector: Option<&str>) -> Vec<FamilyTarget> {
    let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return targets;
    };

    let selected: Vec<FamilyTarget> = targets
        .iter()
        .filter(|t| t.index == selector || t.family.source_key() == selector)
        .cloned()
        .collect();
    if selected.is_empty() {
        warn!(selector = %selector, "Unknown family selector, running all families");
        return targets;
    }
    selected
}

/// Counters of one ingest window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Lower bound of the window, exclusive.
    pub watermark: Option<Watermark>,
    /// Rows read from the result object.
    pub rows: usize,
    /// Result records the reader could not turn into rows.
    pub unreadable: usize,
    /// Rows mapped, enriched and handed to the loader.
    pub processed: usize,
    /// Rows skipped because of a row fault.
    pub row_errors: usize,
    /// Documents the backend accepted.
    pub indexed: usize,
    /// Documents the backend rejected in bulk requests.
    pub rejected: usize,
    /// Bulk requests issued.
    pub flushes: usize,
    /// The destination index was created by this window.
    pub index_created: bool,
    /// Document count of the index after the window, if it could be read.
    pub index_count: Option<u64>,
    pub elapsed: Duration,
}

/// How a family's ingest ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FamilyOutcome {
    /// The window was extracted and indexed.
    Indexed(IngestSummary),
    /// The extraction job failed or was cancelled.
    ExtractionFailed { reason: Option<String> },
    /// The extraction job did not finish in time.
    ExtractionTimedOut { attempts: u32 },
    /// A stage failed before the window could be indexed.
    Failed(String),
}

/// Report of one family in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyReport {
    pub family: Family,
    pub index: String,
    /// `None` when the purge itself failed.
    pub purge: Option<PurgeSummary>,
    pub outcome: FamilyOutcome,
    pub elapsed: Duration,
}

/// Reports of every family in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub families: Vec<FamilyReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Documents indexed across all families.
    pub fn indexed(&self) -> usize {
        self.families
            .iter()
            .map(|report| match &report.outcome {
                FamilyOutcome::Indexed(summary) => summary.indexed,
                _ => 0,
            })
            .sum()
    }

    /// Families whose window was not indexed.
    pub fn failed_families(&self) -> Vec<Family> {
        self.families
            .iter()
            .filter(|report| !matches!(report.outcome, FamilyOutcome::Indexed(_)))
            .map(|report| report.family)
            .collect()
    }
}

/// One line of the index listing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub name: String,
    pub docs_count: Option<String>,
    pub store_size: Option<String>,
    /// Documents with a `time_dt` from today; `None` if the count failed.
    pub today_count: Option<u64>,
}

/// Sequences purge and ingest for the telemetry families.
pub struct Orchestrator {
    client: Arc<SearchIndexClient>,
    runner: ExtractionRunner,
    reader: ResultReader,
    enricher: EmbeddingEnricher,
    lifecycle: IndexLifecycle,
    watermarks: WatermarkResolver,
    purger: RetentionPurger,
    loader_config: LoaderConfig,
}

impl Orchestrator {
    /// Create an orchestrator from its components.
    pub fn new(
        client: Arc<SearchIndexClient>,
        runner: ExtractionRunner,
        reader: ResultReader,
        enricher: EmbeddingEnricher,
        watermarks: WatermarkResolver,
        purger: RetentionPurger,
        loader_config: LoaderConfig,
    ) -> Self {
        Self {
            lifecycle: IndexLifecycle::new(client.clone()),
            client,
            runner,
            reader,
            enricher,
            watermarks,
            purger,
            loader_config,
        }
    }

    /// Run every target, then log the index listing.
    ///
    /// When exactly one target runs, the listing is limited to its index.
    #[instrument(skip(self, targets), fields(families = targets.len()))]
    pub async fn run(&self, targets: &[FamilyTarget]) -> RunSummary {
        let started = Instant::now();
        info!("Starting security lake ingest run");

        let mut summary = RunSummary::default();
        for target in targets {
            summary.families.push(self.run_family(target).await);
        }
        summary.elapsed = started.elapsed();

        let only = match targets {
            [single] => Some(single.index.as_str()),
            _ => None,
        };
        if let Err(e) = self.list_indices(only).await {
            warn!(error = %e, "Failed to list indices");
        }

        info!(
            indexed = summary.indexed(),
            failed = ?summary.failed_families(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Ingest run finished"
        );
        summary
    }

    /// Delete the targets' indices, then run them from scratch.
    pub async fn rebuild(&self, targets: &[FamilyTarget]) -> Result<RunSummary, IngestError> {
        self.delete_indices(targets).await?;
        Ok(self.run(targets).await)
    }

    /// Delete the targets' indices.
    pub async fn delete_indices(&self, targets: &[FamilyTarget]) -> Result<(), IngestError> {
        for target in targets {
            self.lifecycle.delete(&target.index).await?;
        }
        Ok(())
    }

    /// Purge, then ingest one family. Never fails: faults end up in the report.
    #[instrument(skip(self, target), fields(family = %target.family, index = %target.index))]
    pub async fn run_family(&self, target: &FamilyTarget) -> FamilyReport {
        let started = Instant::now();

        let purge = match self.purger.purge(&target.index).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!(error = %e, "Purge failed");
                None
            }
        };
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Purge stage done");

        let outcome = match self.ingest(target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Ingest failed");
                FamilyOutcome::Failed(e.to_string())
            }
        };

        let elapsed = started.elapsed();
        match &outcome {
            FamilyOutcome::Indexed(summary) => info!(
                rows = summary.rows,
                indexed = summary.indexed,
                row_errors = summary.row_errors,
                rejected = summary.rejected,
                elapsed_ms = elapsed.as_millis() as u64,
                "Family done"
            ),
            other => warn!(outcome = ?other, elapsed_ms = elapsed.as_millis() as u64, "Family not indexed"),
        }

        FamilyReport {
            family: target.family,
            index: target.index.clone(),
            purge,
            outcome,
            elapsed,
        }
    }

    /// One extraction window for `target`.
    async fn ingest(&self, target: &FamilyTarget) -> Result<FamilyOutcome, IngestError> {
        let profile = target.profile();
        let watermark = self.watermarks.resolve(&target.index).await?;
        let query = profile.source_query(&target.table, watermark, self.loader_config.record_cap);

        let started = Instant::now();
        let result_name = match self.runner.run(&query).await? {
            ExtractionOutcome::Succeeded { result_name, .. } => result_name,
            ExtractionOutcome::Failed { reason, .. } => {
                return Ok(FamilyOutcome::ExtractionFailed { reason })
            }
            ExtractionOutcome::TimedOut { attempts, .. } => {
                return Ok(FamilyOutcome::ExtractionTimedOut { attempts })
            }
        };
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Extraction stage done");

        let key = self.runner.config().result_key(&result_name);
        let rows = match self.reader.read(&key).await {
            Ok(rows) => rows,
            Err(e) => {
                self.reader.cleanup(&key).await;
                return Err(e);
            }
        };

        let summary = self.index_rows(target, profile, watermark, rows).await;
        self.reader.cleanup(&key).await;
        summary.map(FamilyOutcome::Indexed)
    }

    /// Map, enrich and index the rows of one window in result order.
    async fn index_rows(
        &self,
        target: &FamilyTarget,
        profile: &dyn TelemetryFamily,
        watermark: Option<Watermark>,
        result: ResultSet,
    ) -> Result<IngestSummary, IngestError> {
        let started = Instant::now();
        let mut summary = IngestSummary {
            watermark,
            rows: result.rows.len(),
            unreadable: result.skipped,
            ..IngestSummary::default()
        };
        if result.rows.is_empty() {
            info!("No new rows since the watermark");
            return Ok(summary);
        }

        summary.index_created = self
            .lifecycle
            .ensure(&target.index, &profile.index_settings())
            .await?;

        let mut loader = IndexLoader::new(
            self.client.clone(),
            target.index.as_str(),
            profile.write_mode(),
            &self.loader_config,
        );
        let total = result.rows.len().min(self.loader_config.record_cap);
        let interval = self.loader_config.progress_interval();

        for (position, row) in result.rows.iter().take(total).enumerate() {
            match self.process_row(profile, &mut loader, row).await {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    summary.row_errors += 1;
                    warn!(row = position, error = %e, "Row skipped");
                }
            }

            let done = position + 1;
            if done % interval == 0 || done == total {
                info!(
                    processed = done,
                    total = total,
                    errors = summary.row_errors,
                    "Indexing progress"
                );
            }
        }

        let stats = loader.finish().await;
        summary.indexed = stats.written;
        summary.rejected = stats.rejected;
        summary.flushes = stats.flushes;
        summary.index_count = match self.client.count(&target.index).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(index = %target.index, error = %e, "Failed to read index count");
                None
            }
        };
        summary.elapsed = started.elapsed();
        info!(
            indexed = summary.indexed,
            rejected = summary.rejected,
            index_count = ?summary.index_count,
            error_count = summary.row_errors,
            "Indexing stage done"
        );
        Ok(summary)
    }

    async fn process_row(
        &self,
        profile: &dyn TelemetryFamily,
        loader: &mut IndexLoader,
        row: &RawRow,
    ) -> Result<(), RowError> {
        let document = profile.map_row(row)?;
        let document = self.enricher.enrich(profile, document).await?;
        loader.write(&document).await
    }

    /// List telemetry indices with their sizes and today's document count.
    pub async fn list_indices(&self, only: Option<&str>) -> Result<Vec<IndexReport>, IngestError> {
        let indices = self.client.list_indices(only).await?;

        let mut reports = Vec::new();
        for stats in indices
            .into_iter()
            .filter(|stats| stats.name.starts_with(INDEX_LISTING_PREFIX))
        {
            let today_count = match self
                .client
                .count_range(&stats.name, TIME_DT_FIELD, DateBound::Since(TODAY))
                .await
            {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(index = %stats.name, error = %e, "Failed to count today's documents");
                    None
                }
            };
            info!(
                index = %stats.name,
                today = ?today_count,
                docs = stats.docs_count.as_deref().unwrap_or("-"),
                size = stats.store_size.as_deref().unwrap_or("-"),
                "Index"
            );
            reports.push(IndexReport {
                name: stats.name,
                docs_count: stats.docs_count,
                store_size: stats.store_size,
                today_count,
            });
        }
        Ok(reports)
    }
}
