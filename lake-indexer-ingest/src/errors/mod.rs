//! Error types for the lake indexer ingest.
//!
//! Two levels are kept apart. [`IngestError`] aborts the stage it occurs in
//! (and with it the family's run). [`RowError`] is a fault of a single row:
//! it is counted and the row is skipped.

use lake_indexer_repository::SearchIndexError;
use lake_indexer_shared::Family;
use thiserror::Error;

/// Errors that abort an ingest stage.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the query engine.
    #[error("Query engine error: {0}")]
    QueryEngineError(String),

    /// Error from the object store.
    #[error("Object store error: {0}")]
    ObjectStoreError(String),

    /// Error from the embedding model.
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Error from the search backend.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),

    /// Error parsing or decoding data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration handed to a component.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IngestError {
    /// Create a query engine error.
    pub fn query_engine(msg: impl Into<String>) -> Self {
        Self::QueryEngineError(msg.into())
    }

    /// Create an object store error.
    pub fn object_store(msg: impl Into<String>) -> Self {
        Self::ObjectStoreError(msg.into())
    }

    /// Create an embedding error.
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Faults confined to one row.
#[derive(Error, Debug)]
pub enum RowError {
    /// The result set has no such column.
    #[error("missing column `{0}`")]
    MissingColumn(String),

    /// A required value was empty.
    #[error("column `{0}` is empty")]
    EmptyValue(String),

    /// A numeric column did not hold an integer.
    #[error("column `{column}` is not an integer: {value}")]
    InvalidNumber { column: String, value: String },

    /// A boolean column did not hold `true` or `false`.
    #[error("column `{column}` is not a boolean: {value}")]
    InvalidBoolean { column: String, value: String },

    /// A JSON column could not be decoded.
    #[error("column `{column}` holds malformed JSON: {reason}")]
    InvalidJson { column: String, reason: String },

    /// A timestamp column could not be parsed.
    #[error("column `{column}` is not an ISO-8601 timestamp: {value}")]
    InvalidTimestamp { column: String, value: String },

    /// The document was handed to the wrong family's renderer.
    #[error("document of family {found} cannot be rendered as {expected}")]
    FamilyMismatch { expected: Family, found: Family },

    /// The embedding call failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The embedding model returned a vector of the wrong length.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The document could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend rejected a single-document write.
    #[error("write failed: {0}")]
    Write(String),
}

impl RowError {
    /// Create an invalid JSON error for a column.
    pub fn invalid_json(column: &str, reason: impl ToString) -> Self {
        Self::InvalidJson {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }
}
