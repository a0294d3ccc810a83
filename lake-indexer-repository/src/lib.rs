//! # Lake Indexer Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search backend that holds the telemetry indices. It includes definitions
//! for errors, the provider interface, a validating client wrapper and a
//! concrete implementation for OpenSearch (including the serverless
//! collections signed with SigV4).

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use client::SearchIndexClient;
pub use config::SearchIndexConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::{OpenSearchClient, SearchAuth};
pub use types::{BulkItemFailure, BulkOperationSummary, IndexStats, RangePage};
