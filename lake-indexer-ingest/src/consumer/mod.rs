//! Consumer module for the lake indexer ingest.
//!
//! Pulls one extraction window out of the security lake: a query is submitted
//! to the query engine, polled to completion, and its tabular result object
//! is read from the object store into raw rows.

mod athena;
mod credentials;
mod extraction;
mod object_store;
mod query_engine;
mod reader;

pub use athena::AthenaQueryEngine;
pub use credentials::{AmbientCredentials, AssumeRoleCredentials, CredentialProvider};
pub use extraction::{ExtractionConfig, ExtractionOutcome, ExtractionRunner};
pub use object_store::{ObjectStore, S3ObjectStore};
pub use query_engine::{JobState, JobStatus, QueryEngine, QueryRequest};
pub use reader::{ResultReader, ResultSet};
