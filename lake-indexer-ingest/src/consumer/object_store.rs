//! Object store interface and its S3 implementation.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::errors::IngestError;

/// Store holding query result objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IngestError>;

    /// Delete an object.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), IngestError>;
}

/// Object store backed by Amazon S3.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a store from an SDK configuration.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, IngestError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::object_store(DisplayErrorContext(&e).to_string()))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| IngestError::object_store(e.to_string()))?;

        let bytes = data.into_bytes();
        debug!(bucket = %bucket, key = %key, size = bytes.len(), "Object read");
        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), IngestError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::object_store(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket = %bucket, key = %key, "Object deleted");
        Ok(())
    }
}
