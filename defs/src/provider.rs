use async_trait::async_trait;

use crate::{DeployError, DeploymentRequest, DeploymentResult, Provider, ValidationError};

/// The deploy capability of one target provider.
///
/// Implementations submit exactly once per call and never retry. Failures are
/// returned as `DeployError` and left for the caller to report. Naming
/// collisions between requests are the caller's concern.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Provider specific rules a schema-valid request must also satisfy.
    fn validate(&self, request: &DeploymentRequest) -> Result<(), ValidationError>;

    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentResult, DeployError>;
}
