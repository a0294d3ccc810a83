//! Athena implementation of the query engine.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use tracing::debug;
use uuid::Uuid;

use super::credentials::CredentialProvider;
use super::query_engine::{JobState, JobStatus, QueryEngine, QueryRequest};
use crate::errors::IngestError;

/// Query engine backed by Amazon Athena.
pub struct AthenaQueryEngine {
    client: Client,
}

impl AthenaQueryEngine {
    /// Create an engine from an SDK configuration.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Create an engine using credentials from the given provider.
    pub async fn with_credentials(provider: &dyn CredentialProvider, region: &str) -> Self {
        let sdk_config = provider.load(region).await;
        Self::new(&sdk_config)
    }

    fn map_state(state: &QueryExecutionState) -> Result<JobState, IngestError> {
        match state {
            QueryExecutionState::Queued => Ok(JobState::Queued),
            QueryExecutionState::Running => Ok(JobState::Running),
            QueryExecutionState::Succeeded => Ok(JobState::Succeeded),
            QueryExecutionState::Failed => Ok(JobState::Failed),
            QueryExecutionState::Cancelled => Ok(JobState::Cancelled),
            other => Err(IngestError::query_engine(format!(
                "unknown query state {}",
                other.as_str()
            ))),
        }
    }
}

#[async_trait]
impl QueryEngine for AthenaQueryEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<String, IngestError> {
        let output = self
            .client
            .start_query_execution()
            .query_string(&request.query)
            .client_request_token(Uuid::new_v4().to_string())
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.database)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.output_location)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| IngestError::query_engine(DisplayErrorContext(&e).to_string()))?;

        let job_id = output
            .query_execution_id()
            .ok_or_else(|| IngestError::query_engine("query submission returned no id"))?;

        debug!(job_id = %job_id, "Query submitted");
        Ok(job_id.to_string())
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, IngestError> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(job_id)
            .send()
            .await
            .map_err(|e| IngestError::query_engine(DisplayErrorContext(&e).to_string()))?;

        let execution = output.query_execution();
        let status = execution.and_then(|e| e.status());

        let state = match status.and_then(|s| s.state()) {
            Some(state) => Self::map_state(state)?,
            None => JobState::Queued,
        };

        Ok(JobStatus {
            state,
            output_location: execution
                .and_then(|e| e.result_configuration())
                .and_then(|r| r.output_location())
                .map(str::to_string),
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        })
    }
}
