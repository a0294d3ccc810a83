//! Index lifecycle.
//!
//! Creates a family index with its vector mapping when it is missing and
//! deletes it for rebuilds. Mappings of existing indices are never touched.

use std::sync::Arc;
use tracing::{info, instrument};

use serde_json::Value;

use crate::errors::IngestError;
use lake_indexer_repository::SearchIndexClient;

/// Manages existence of the telemetry indices.
pub struct IndexLifecycle {
    client: Arc<SearchIndexClient>,
}

impl IndexLifecycle {
    pub fn new(client: Arc<SearchIndexClient>) -> Self {
        Self { client }
    }

    /// Create `index` with `settings` unless it already exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index was created
    /// * `Ok(false)` - The index already existed
    #[instrument(skip(self, settings))]
    pub async fn ensure(&self, index: &str, settings: &Value) -> Result<bool, IngestError> {
        if self.client.index_exists(index).await? {
            return Ok(false);
        }

        self.client.create_index(index, settings).await?;
        info!(index = %index, "Index created");
        Ok(true)
    }

    /// Delete `index`; a missing index is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, index: &str) -> Result<(), IngestError> {
        self.client.delete_index(index).await?;
        info!(index = %index, "Index deleted");
        Ok(())
    }

    /// Delete and recreate `index`.
    pub async fn rebuild(&self, index: &str, settings: &Value) -> Result<(), IngestError> {
        self.delete(index).await?;
        self.ensure(index, settings).await?;
        Ok(())
    }
}
