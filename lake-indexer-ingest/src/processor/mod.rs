//! Processor module for the lake indexer ingest.
//!
//! Maps raw result rows into family documents and enriches them with
//! embeddings.

pub mod columns;
pub mod enricher;
pub mod families;
pub mod render;

pub use enricher::{BedrockEmbeddingModel, EmbeddingEnricher, EmbeddingModel, DEFAULT_EMBEDDING_MODEL};
pub use families::{family_profile, TelemetryFamily};
