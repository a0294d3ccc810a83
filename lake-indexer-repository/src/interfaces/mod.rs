//! Interface definitions for the search backend.
//!
//! The `SearchIndexProvider` trait allows for dependency injection and
//! swappable search backend implementations.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
