//! Extraction job runner.
//!
//! Submits one rendered source query and polls it at a fixed interval until
//! it reaches a terminal state or the attempt budget runs out. Running out of
//! attempts is reported as a timeout: the window is abandoned and the next
//! scheduled run retries from the same watermark.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::query_engine::{JobState, QueryEngine, QueryRequest};
use crate::errors::IngestError;

/// Configuration for the extraction runner.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Database the source tables live in.
    pub database: String,
    /// Bucket the engine writes results to.
    pub bucket: String,
    /// Key prefix for result objects.
    pub prefix: String,
    /// Maximum number of status polls before giving up.
    pub max_poll_attempts: u32,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            bucket: String::new(),
            prefix: "temp-athena-output".to_string(),
            max_poll_attempts: 30,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl ExtractionConfig {
    /// Output location handed to the engine.
    pub fn output_location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }

    /// Object key of a result object, given its basename.
    pub fn result_key(&self, result_name: &str) -> String {
        format!("{}/{}", self.prefix, result_name)
    }
}

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// The job succeeded; `result_name` is the basename of the result object.
    Succeeded { job_id: String, result_name: String },
    /// The job failed or was cancelled.
    Failed {
        job_id: String,
        reason: Option<String>,
    },
    /// The job was still queued or running when the attempt budget ran out.
    TimedOut { job_id: String, attempts: u32 },
}

impl ExtractionOutcome {
    /// Basename of the result object, only for successful jobs.
    pub fn result_name(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Succeeded { result_name, .. } => Some(result_name.as_str()),
            _ => None,
        }
    }
}

/// Runs extraction queries against a query engine.
pub struct ExtractionRunner {
    engine: Arc<dyn QueryEngine>,
    config: ExtractionConfig,
}

impl ExtractionRunner {
    /// Create a runner.
    pub fn new(engine: Arc<dyn QueryEngine>, config: ExtractionConfig) -> Self {
        Self { engine, config }
    }

    /// The runner's configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Submit `query` and poll it to completion or timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionOutcome)` - Success, failure or timeout of the job
    /// * `Err(IngestError)` - If the engine could not be reached
    #[instrument(skip(self, query), fields(database = %self.config.database))]
    pub async fn run(&self, query: &str) -> Result<ExtractionOutcome, IngestError> {
        let request = QueryRequest {
            query: query.to_string(),
            database: self.config.database.clone(),
            output_location: self.config.output_location(),
        };

        let job_id = self.engine.submit(&request).await?;
        info!(job_id = %job_id, "Extraction query submitted");

        let mut attempts = 0;
        while attempts < self.config.max_poll_attempts {
            attempts += 1;
            let status = self.engine.status(&job_id).await?;

            match status.state {
                JobState::Succeeded => {
                    let location = status.output_location.ok_or_else(|| {
                        IngestError::query_engine(format!(
                            "query {} succeeded without an output location",
                            job_id
                        ))
                    })?;
                    let result_name = basename(&location).to_string();
                    info!(
                        job_id = %job_id,
                        attempts = attempts,
                        result = %result_name,
                        "Extraction query succeeded"
                    );
                    return Ok(ExtractionOutcome::Succeeded {
                        job_id,
                        result_name,
                    });
                }
                JobState::Failed | JobState::Cancelled => {
                    warn!(
                        job_id = %job_id,
                        state = ?status.state,
                        reason = status.reason.as_deref().unwrap_or("unknown"),
                        "Extraction query failed"
                    );
                    return Ok(ExtractionOutcome::Failed {
                        job_id,
                        reason: status.reason,
                    });
                }
                JobState::Queued | JobState::Running => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        warn!(job_id = %job_id, attempts = attempts, "Timed out waiting for extraction query");
        Ok(ExtractionOutcome::TimedOut { job_id, attempts })
    }
}

fn basename(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or(location)
}
