//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, in-memory test
//! doubles, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{BulkOperationSummary, IndexStats};

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into `SearchIndexClient` to enable dependency
/// injection and easy testing with mock implementations. Documents and query
/// bodies are plain JSON so the provider stays independent of any family
/// schema.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error
/// handling across different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create an index with the given settings and mappings.
    ///
    /// # Arguments
    ///
    /// * `index` - Name of the index to create
    /// * `settings` - Full create-index body (`settings` and `mappings`)
    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError>;

    /// Delete an index. Deleting an index that does not exist is not an error.
    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Create a single document with a backend-generated id.
    async fn create_document(&self, index: &str, document: &Value)
        -> Result<(), SearchIndexError>;

    /// Create many documents in one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkOperationSummary)` - Per-item outcome counts; partial failure is not an error
    /// * `Err(SearchIndexError)` - If the bulk request fails entirely
    async fn bulk_create(
        &self,
        index: &str,
        documents: &[Value],
    ) -> Result<BulkOperationSummary, SearchIndexError>;

    /// Delete many documents by id in one bulk request.
    async fn bulk_delete(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<BulkOperationSummary, SearchIndexError>;

    /// Run a search request and return the raw response body.
    async fn search(&self, index: &str, body: &Value) -> Result<Value, SearchIndexError>;

    /// Count the documents matching `query` (all documents when `None`).
    async fn count(&self, index: &str, query: Option<&Value>) -> Result<u64, SearchIndexError>;

    /// List indices, optionally restricted to a name or pattern.
    async fn list_indices(&self, pattern: Option<&str>)
        -> Result<Vec<IndexStats>, SearchIndexError>;
}
