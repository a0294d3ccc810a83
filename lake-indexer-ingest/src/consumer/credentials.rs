//! Credential providers for the AWS clients.
//!
//! The query engine may live in another account than the pipeline. Instead
//! of branching on whether explicit credentials were passed, the runner is
//! handed a provider: ambient identity by default, an assumed role for the
//! cross-account case.

use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::info;

/// Produces the SDK configuration used to build AWS clients.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Load an SDK configuration for the given region.
    async fn load(&self, region: &str) -> SdkConfig;
}

/// Ambient identity: environment, profile, container or instance role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientCredentials;

#[async_trait]
impl CredentialProvider for AmbientCredentials {
    async fn load(&self, region: &str) -> SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await
    }
}

/// Credentials obtained by assuming a role, typically in another account.
#[derive(Debug, Clone)]
pub struct AssumeRoleCredentials {
    role_arn: String,
    session_name: String,
}

impl AssumeRoleCredentials {
    /// Create a provider that assumes `role_arn`.
    pub fn new(role_arn: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for AssumeRoleCredentials {
    async fn load(&self, region: &str) -> SdkConfig {
        info!(role_arn = %self.role_arn, "Assuming role for query engine access");

        let provider = AssumeRoleProvider::builder(&self.role_arn)
            .session_name(&self.session_name)
            .region(Region::new(region.to_string()))
            .build()
            .await;

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(provider)
            .load()
            .await
    }
}
