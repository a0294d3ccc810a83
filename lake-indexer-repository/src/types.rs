//! Request and response types for search index operations.

use serde::{Deserialize, Serialize};

/// One bulk item the backend rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    /// Position of the item in the request.
    pub position: usize,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Reason given by the backend, if any.
    pub reason: Option<String>,
}

/// Summary of a bulk request.
///
/// Bulk requests are processed per item, so a request can partially fail.
/// `errors` mirrors the backend's top-level flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOperationSummary {
    /// Server-side processing time in milliseconds.
    pub took_ms: u64,
    /// Number of items in the response.
    pub total: usize,
    /// Number of items that succeeded.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Whether the backend reported any item-level error.
    pub errors: bool,
    /// Details of the failed items.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkOperationSummary {
    /// Summary for a request that carried no items.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One page of document ids matched by a range search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangePage {
    /// Total matches reported by the backend (may exceed the page).
    pub total_matched: u64,
    /// Ids of the documents in this page.
    pub ids: Vec<String>,
}

/// Size information for one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index name.
    #[serde(rename = "index")]
    pub name: String,
    /// Number of documents, as reported by the backend.
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    /// Human readable store size.
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}
