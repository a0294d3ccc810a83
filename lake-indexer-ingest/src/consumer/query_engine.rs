//! Query engine interface.

use async_trait::async_trait;

use crate::errors::IngestError;

/// State of a submitted query job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Snapshot of a job as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Full location of the result object, known once the job succeeded.
    pub output_location: Option<String>,
    /// Engine-provided explanation of the last state change.
    pub reason: Option<String>,
}

impl JobStatus {
    /// Status with only the state set.
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            output_location: None,
            reason: None,
        }
    }
}

/// A query to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Fully rendered query text.
    pub query: String,
    /// Namespace (database) the query runs against.
    pub database: String,
    /// Location the engine writes results to, e.g. `s3://bucket/prefix`.
    pub output_location: String,
}

/// An asynchronous batch query engine.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit a query and return the job id.
    async fn submit(&self, request: &QueryRequest) -> Result<String, IngestError>;

    /// Fetch the current status of a job.
    async fn status(&self, job_id: &str) -> Result<JobStatus, IngestError>;
}
