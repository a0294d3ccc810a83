//! # Lake Indexer Shared
//!
//! Shared types and data structures used across the security lake indexer
//! crates: telemetry families, raw result rows and the documents written to
//! the search index.

pub mod document;
pub mod family;
pub mod records;
pub mod row;

pub use document::{Document, Envelope};
pub use family::Family;
pub use records::{
    CloudTrailRecord, FamilyRecord, LambdaRecord, Route53Record, S3DataRecord,
    SecurityHubRecord, VpcFlowRecord,
};
pub use row::RawRow;

/// Length of every `embedding_vector` written to a telemetry index.
pub const EMBEDDING_DIMENSION: usize = 512;

/// A watermark: epoch milliseconds of the newest record already indexed.
pub type Watermark = i64;
