//! # Lake Indexer Ingest
//!
//! This crate provides the ingest components that copy security telemetry
//! out of the security lake into per-family vector search indices.
//!
//! ## Architecture
//!
//! The ingest follows the Consumer-Processor-Loader pattern, run once per
//! family and invocation:
//!
//! 1. **Consumer**: Runs the extraction query above the watermark and reads its result rows
//! 2. **Processor**: Maps rows into family documents and attaches embeddings
//! 3. **Loader**: Writes documents per document or in bulk batches
//! 4. **Orchestrator**: Purges expired documents, then coordinates one ingest window
//!
//! The watermark resolver, index lifecycle manager and retention purger are
//! the orchestrator's helpers around the search backend.

pub mod consumer;
pub mod errors;
pub mod lifecycle;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod retention;
pub mod watermark;

#[cfg(test)]
mod test_support;

pub use errors::{IngestError, RowError};
pub use orchestrator::{FamilyOutcome, FamilyTarget, Orchestrator, RunSummary};
