//! Dependency initialization and wiring for the lake indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::settings::{SearchAuthMode, Settings, QUERY_ROLE_SESSION};
use crate::IndexingError;
use lake_indexer_ingest::consumer::{
    AmbientCredentials, AssumeRoleCredentials, AthenaQueryEngine, CredentialProvider,
    ExtractionRunner, QueryEngine, ResultReader, S3ObjectStore,
};
use lake_indexer_ingest::processor::{BedrockEmbeddingModel, EmbeddingEnricher};
use lake_indexer_ingest::retention::RetentionPurger;
use lake_indexer_ingest::watermark::WatermarkResolver;
use lake_indexer_ingest::Orchestrator;
use lake_indexer_repository::{OpenSearchClient, SearchAuth, SearchIndexClient, SearchIndexConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the settings.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            region = %settings.region,
            search_endpoint = %settings.search_endpoint,
            database = %settings.database,
            families = settings.targets().len(),
            "Initializing dependencies"
        );

        let sdk_config = AmbientCredentials.load(&settings.region).await;

        // Search backend
        let auth = match settings.search_auth {
            SearchAuthMode::SigV4 => SearchAuth::AwsSigV4 {
                sdk_config: sdk_config.clone(),
                service_name: settings.search_service_name.clone(),
            },
            SearchAuthMode::None => SearchAuth::None,
        };
        let search_client = OpenSearchClient::new(&settings.search_endpoint, auth)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;
        let client = Arc::new(SearchIndexClient::with_config(
            Box::new(search_client),
            SearchIndexConfig::with_max_batch_size(settings.max_batch_size()),
        ));

        // Query engine, possibly in another account
        let engine: Arc<dyn QueryEngine> = match &settings.query_role_arn {
            Some(role_arn) => {
                let provider = AssumeRoleCredentials::new(role_arn.as_str(), QUERY_ROLE_SESSION);
                Arc::new(AthenaQueryEngine::with_credentials(&provider, &settings.region).await)
            }
            None => Arc::new(AthenaQueryEngine::new(&sdk_config)),
        };
        info!(assumed_role = settings.query_role_arn.is_some(), "Query engine created");

        let runner = ExtractionRunner::new(engine, settings.extraction_config());
        let reader = ResultReader::new(
            Arc::new(S3ObjectStore::new(&sdk_config)),
            settings.result_bucket.as_str(),
        );
        let enricher = EmbeddingEnricher::new(Arc::new(BedrockEmbeddingModel::new(
            &sdk_config,
            settings.embedding_model.as_str(),
        )));

        let orchestrator = Orchestrator::new(
            client.clone(),
            runner,
            reader,
            enricher,
            WatermarkResolver::new(client.clone(), settings.watermark_config()),
            RetentionPurger::new(client, settings.purge_config()),
            settings.loader_config(),
        );

        Ok(Self { orchestrator })
    }
}
