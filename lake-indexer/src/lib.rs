//! # Lake Indexer
//!
//! Main library for the security lake indexer.
//!
//! This crate provides the entry point and configuration for running
//! the ingest pipeline as one scheduled batch invocation.

pub mod config;

pub use config::{Dependencies, LogFormat, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] lake_indexer_ingest::IngestError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] lake_indexer_repository::SearchIndexError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
