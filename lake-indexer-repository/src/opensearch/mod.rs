//! OpenSearch implementation of the search index provider.

mod client;
pub mod index_config;
pub mod queries;

pub use client::{OpenSearchClient, SearchAuth};
