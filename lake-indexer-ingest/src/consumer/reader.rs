//! Result reader.
//!
//! Reads a query result object (UTF-8 delimited text with a header row) into
//! raw rows, and removes the object and its metadata sibling once the window
//! has been processed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use lake_indexer_shared::RawRow;

use super::object_store::ObjectStore;
use crate::errors::IngestError;

/// Suffix of the metadata object written next to every result object.
const METADATA_SUFFIX: &str = ".metadata";

/// Rows of one extraction window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Rows in result order.
    pub rows: Vec<RawRow>,
    /// Records that could not be read as rows.
    pub skipped: usize,
}

/// Reads result objects from a bucket.
pub struct ResultReader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ResultReader {
    /// Create a reader for objects in `bucket`.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Read the result object at `key`.
    pub async fn read(&self, key: &str) -> Result<ResultSet, IngestError> {
        let bytes = self.store.get(&self.bucket, key).await?;
        let result = parse_rows(&bytes)?;
        info!(key = %key, rows = result.rows.len(), skipped = result.skipped, "Result rows read");
        Ok(result)
    }

    /// Delete the result object at `key` and its metadata sibling.
    ///
    /// Failures are logged; a leftover object only costs storage.
    pub async fn cleanup(&self, key: &str) {
        let metadata_key = format!("{}{}", key, METADATA_SUFFIX);
        for key in [key, metadata_key.as_str()] {
            match self.store.delete(&self.bucket, key).await {
                Ok(()) => debug!(key = %key, "Result object removed"),
                Err(e) => warn!(key = %key, error = %e, "Failed to remove result object"),
            }
        }
    }
}

/// Parse delimited text with a header row into raw rows.
///
/// A record whose field count differs from the header is skipped and counted.
pub fn parse_rows(bytes: &[u8]) -> Result<ResultSet, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| IngestError::parse(format!("result object is not UTF-8: {}", e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut result = ResultSet::default();
    for (position, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let row: RawRow = headers.iter().zip(record.iter()).collect();
                result.rows.push(row);
            }
            Err(e) => {
                warn!(position = position, error = %e, "Skipping unreadable result record");
                result.skipped += 1;
            }
        }
    }

    Ok(result)
}
