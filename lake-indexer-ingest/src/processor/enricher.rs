//! Embedding enrichment.
//!
//! Renders a document's summary text, asks the embedding model for a
//! normalized vector of the index dimension and attaches it to the document.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lake_indexer_shared::{Document, EMBEDDING_DIMENSION};

use super::families::TelemetryFamily;
use crate::errors::{IngestError, RowError};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "amazon.titan-embed-text-v2:0";

/// Text embedding model.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed `text` into a vector of `dimensions` elements.
    async fn embed(
        &self,
        text: &str,
        dimensions: usize,
        normalize: bool,
    ) -> Result<Vec<f32>, IngestError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest<'a> {
    input_text: &'a str,
    dimensions: usize,
    normalize: bool,
}

#[derive(Deserialize)]
struct TitanResponse {
    embedding: Vec<f32>,
}

/// Embedding model served by Amazon Bedrock (Titan text embeddings).
pub struct BedrockEmbeddingModel {
    client: Client,
    model_id: String,
}

impl BedrockEmbeddingModel {
    /// Create a model client.
    pub fn new(sdk_config: &SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk_config),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl EmbeddingModel for BedrockEmbeddingModel {
    async fn embed(
        &self,
        text: &str,
        dimensions: usize,
        normalize: bool,
    ) -> Result<Vec<f32>, IngestError> {
        let body = serde_json::to_vec(&TitanRequest {
            input_text: text,
            dimensions,
            normalize,
        })
        .map_err(|e| IngestError::embedding(e.to_string()))?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| IngestError::embedding(DisplayErrorContext(&e).to_string()))?;

        let response: TitanResponse = serde_json::from_slice(output.body().as_ref())
            .map_err(|e| IngestError::embedding(format!("unexpected model response: {}", e)))?;

        debug!(model = %self.model_id, dimensions = response.embedding.len(), "Embedding computed");
        Ok(response.embedding)
    }
}

/// Attaches embeddings to mapped documents.
pub struct EmbeddingEnricher {
    model: Arc<dyn EmbeddingModel>,
    dimension: usize,
}

impl EmbeddingEnricher {
    /// Create an enricher producing vectors of the index dimension.
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            model,
            dimension: EMBEDDING_DIMENSION,
        }
    }

    /// Embed `document` using the summary text of its family.
    ///
    /// A failed call or a vector of the wrong length is a fault of this row.
    pub async fn enrich(
        &self,
        profile: &dyn TelemetryFamily,
        document: Document,
    ) -> Result<Document, RowError> {
        let text = profile.embedding_text(&document)?;
        let vector = self
            .model
            .embed(&text, self.dimension, true)
            .await
            .map_err(|e| RowError::Embedding(e.to_string()))?;

        if vector.len() != self.dimension {
            return Err(RowError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(document.with_embedding(vector))
    }
}
