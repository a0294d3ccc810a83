//! Search index client implementation.
//!
//! This module provides the main client for interacting with the telemetry
//! indices. Pipeline code uses this to probe, create and delete indices,
//! write documents, and run the watermark and retention queries.

use serde_json::Value;

use crate::config::SearchIndexConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::queries::{self, DateBound};
use crate::types::{BulkOperationSummary, IndexStats, RangePage};

/// The main client for interacting with the search index.
pub struct SearchIndexClient {
    provider: Box<dyn SearchIndexProvider>,
    config: SearchIndexConfig,
}

impl SearchIndexClient {
    /// Create a new SearchIndexClient with default configuration.
    pub fn new(provider: Box<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new SearchIndexClient with custom configuration.
    pub fn with_config(provider: Box<dyn SearchIndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    fn validate_index(index: &str) -> Result<(), SearchIndexError> {
        if index.trim().is_empty() {
            return Err(SearchIndexError::validation("index name is required"));
        }
        Ok(())
    }

    /// Check whether an index exists.
    pub async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Self::validate_index(index)?;
        self.provider.index_exists(index).await
    }

    /// Create an index with a full settings/mappings body.
    pub async fn create_index(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        Self::validate_index(index)?;
        self.provider.create_index(index, settings).await
    }

    /// Delete an index. Missing indices are not an error.
    pub async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        Self::validate_index(index)?;
        self.provider.delete_index(index).await
    }

    /// Create one document.
    pub async fn create_document(
        &self,
        index: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        Self::validate_index(index)?;
        if !document.is_object() {
            return Err(SearchIndexError::validation("document must be a JSON object"));
        }
        self.provider.create_document(index, document).await
    }

    /// Create many documents in one bulk request.
    ///
    /// The batch size is limited by the configured max_batch_size.
    /// Individual failures are reported in the summary.
    pub async fn bulk_create(
        &self,
        index: &str,
        documents: &[Value],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        Self::validate_index(index)?;
        if documents.is_empty() {
            return Ok(BulkOperationSummary::empty());
        }

        self.validate_batch_size(documents.len())?;
        self.provider.bulk_create(index, documents).await
    }

    /// Delete many documents by id in one bulk request.
    ///
    /// The batch size is limited by the configured max_batch_size.
    pub async fn bulk_delete(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        Self::validate_index(index)?;
        if ids.is_empty() {
            return Ok(BulkOperationSummary::empty());
        }

        self.validate_batch_size(ids.len())?;
        self.provider.bulk_delete(index, ids).await
    }

    /// Maximum value of a numeric or date field, `None` for an empty index.
    pub async fn max_value(&self, index: &str, field: &str) -> Result<Option<f64>, SearchIndexError> {
        Self::validate_index(index)?;
        let response = self
            .provider
            .search(index, &queries::max_aggregation_query(field))
            .await?;
        Ok(queries::parse_max_aggregation(&response))
    }

    /// One page of ids of documents whose `field` is older than `boundary`.
    pub async fn page_older_than(
        &self,
        index: &str,
        field: &str,
        boundary: &str,
        size: usize,
    ) -> Result<RangePage, SearchIndexError> {
        Self::validate_index(index)?;
        let body = queries::date_range_page_query(field, DateBound::Before(boundary), size);
        let response = self.provider.search(index, &body).await?;
        queries::parse_range_page(&response)
    }

    /// Count all documents of an index.
    pub async fn count(&self, index: &str) -> Result<u64, SearchIndexError> {
        Self::validate_index(index)?;
        self.provider.count(index, None).await
    }

    /// Count documents whose date `field` falls within `bound`.
    pub async fn count_range(
        &self,
        index: &str,
        field: &str,
        bound: DateBound<'_>,
    ) -> Result<u64, SearchIndexError> {
        Self::validate_index(index)?;
        let query = queries::date_range_query(field, bound);
        self.provider.count(index, Some(&query)).await
    }

    /// List indices, optionally restricted to one name or pattern.
    pub async fn list_indices(
        &self,
        pattern: Option<&str>,
    ) -> Result<Vec<IndexStats>, SearchIndexError> {
        self.provider.list_indices(pattern).await
    }
}
