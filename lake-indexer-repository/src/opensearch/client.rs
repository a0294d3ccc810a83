//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust client. Serverless collections require SigV4
//! signed requests; local clusters can be reached without authentication.

use async_trait::async_trait;
use aws_config::SdkConfig;
use opensearch::{
    auth::Credentials,
    cat::CatIndicesParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    BulkParts, CountParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::queries;
use crate::types::{BulkOperationSummary, IndexStats};

/// How requests to the backend are authenticated.
#[derive(Debug, Clone)]
pub enum SearchAuth {
    /// No authentication (local development clusters).
    None,
    /// AWS SigV4 request signing with credentials from the SDK config.
    AwsSigV4 {
        sdk_config: SdkConfig,
        /// Signing service name, `aoss` for serverless collections and `es`
        /// for managed domains.
        service_name: String,
    },
}

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let sdk_config = aws_config::load_from_env().await;
/// let auth = SearchAuth::AwsSigV4 { sdk_config, service_name: "aoss".into() };
/// let client = OpenSearchClient::new("https://abc.us-east-1.aoss.amazonaws.com", auth).await?;
///
/// client.create_document("security_lake_vpc_flow_index", &json!({"time": 1})).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch endpoint (e.g., "http://localhost:9200")
    /// * `auth` - Request authentication
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, auth: SearchAuth) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();

        let signed = matches!(auth, SearchAuth::AwsSigV4 { .. });
        if let SearchAuth::AwsSigV4 {
            sdk_config,
            service_name,
        } = auth
        {
            let credentials = Credentials::try_from(sdk_config)
                .map_err(|e| SearchIndexError::connection(e.to_string()))?;
            builder = builder.auth(credentials).service_name(&service_name);
        }

        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, signed = signed, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Pass a successful response through, or log and convert a failed one.
    async fn ensure_success(
        response: Response,
        action: &str,
        to_error: fn(String) -> SearchIndexError,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %error_body, action = action, "Request failed");
        Err(to_error(format!(
            "{} failed with status {}: {}",
            action, status, error_body
        )))
    }

    async fn read_json(response: Response) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }

    async fn send_bulk(
        &self,
        index: &str,
        body: Vec<JsonBody<Value>>,
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Bulk", SearchIndexError::BulkOperationError).await?;
        let body = Self::read_json(response).await?;
        Ok(queries::parse_bulk_response(&body))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Self::ensure_success(response, "Index exists", SearchIndexError::IndexError)
                .await
                .map(|_| false),
        }
    }

    /// Create an index with the given settings and mappings.
    ///
    /// The body is applied only at creation; existing indices are never
    /// migrated.
    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        Self::ensure_success(response, "Create index", SearchIndexError::IndexError).await?;
        info!(index = %index, "Index created");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        // 404 is acceptable - index may not exist
        if response.status_code().as_u16() == 404 {
            debug!(index = %index, "Index to delete does not exist");
            return Ok(());
        }

        Self::ensure_success(response, "Delete index", SearchIndexError::IndexError).await?;
        info!(index = %index, "Index deleted");
        Ok(())
    }

    async fn create_document(
        &self,
        index: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::Index(index))
            .body(document.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::document(e.to_string()))?;

        Self::ensure_success(response, "Create document", SearchIndexError::DocumentError)
            .await?;
        Ok(())
    }

    /// Create many documents in one `_bulk` request.
    ///
    /// Each document is sent as a `create` action without an explicit id so
    /// the backend assigns one; time series collections reject custom ids.
    async fn bulk_create(
        &self,
        index: &str,
        documents: &[Value],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            body.push(json!({"create": {"_index": index}}).into());
            body.push(document.clone().into());
        }

        self.send_bulk(index, body).await
    }

    async fn bulk_delete(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        let body: Vec<JsonBody<Value>> = ids
            .iter()
            .map(|id| json!({"delete": {"_id": id}}).into())
            .collect();

        self.send_bulk(index, body).await
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Search", SearchIndexError::QueryError).await?;
        Self::read_json(response).await
    }

    async fn count(&self, index: &str, query: Option<&Value>) -> Result<u64, SearchIndexError> {
        let body = query
            .cloned()
            .unwrap_or_else(|| json!({"query": {"match_all": {}}}));

        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let response =
            Self::ensure_success(response, "Count", SearchIndexError::QueryError).await?;
        let body = Self::read_json(response).await?;
        queries::parse_count(&body)
    }

    async fn list_indices(
        &self,
        pattern: Option<&str>,
    ) -> Result<Vec<IndexStats>, SearchIndexError> {
        let patterns: Vec<&str> = pattern.into_iter().collect();
        let parts = if patterns.is_empty() {
            CatIndicesParts::None
        } else {
            CatIndicesParts::Index(&patterns)
        };

        let response = self
            .client
            .cat()
            .indices(parts)
            .format("json")
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let response =
            Self::ensure_success(response, "List indices", SearchIndexError::QueryError).await?;
        response
            .json::<Vec<IndexStats>>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }
}
