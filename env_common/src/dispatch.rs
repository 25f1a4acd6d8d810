use deploy_defs::{DeployError, DeploymentRequest, DeploymentResult, ProviderError};
use std::time::Duration;

use crate::AdapterRegistry;

/// Routes a validated request to its provider adapter and runs the deploy
/// call as its own task, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: AdapterRegistry,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: AdapterRegistry, timeout: Duration) -> Self {
        Dispatcher { registry, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn dispatch(
        &self,
        request: DeploymentRequest,
    ) -> Result<DeploymentResult, DeployError> {
        let provider = request.provider();
        let adapter = self.registry.get(provider).ok_or_else(|| {
            DeployError::Internal(format!("No adapter registered for provider {}", provider))
        })?;

        adapter.validate(&request)?;

        let context = request.to_string();
        log::info!("Dispatching deployment: {}", context);

        let handle = tokio::spawn(async move { adapter.deploy(&request).await });
        let abort_handle = handle.abort_handle();

        let result = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) if join_error.is_panic() => {
                log::error!("Adapter panicked while deploying: {}", context);
                return Err(DeployError::Internal(
                    "The provider adapter failed unexpectedly".to_string(),
                ));
            }
            Ok(Err(join_error)) => {
                return Err(DeployError::Internal(format!(
                    "The deployment task was cancelled: {}",
                    join_error
                )));
            }
            Err(_) => {
                abort_handle.abort();
                log::warn!(
                    "Deployment timed out after {:?}: {}",
                    self.timeout,
                    context
                );
                return Err(ProviderError::TimedOut(self.timeout).into());
            }
        };

        match result {
            Ok(result) if result.is_success() && !result.has_provider_reference() => {
                Err(DeployError::Internal(
                    "The provider adapter reported success without a provider reference"
                        .to_string(),
                ))
            }
            Ok(result) => {
                log::info!("Deployment finished ({}): {}", result.message, context);
                Ok(result)
            }
            Err(e) => {
                log::error!("Deployment failed: {}: {}", context, e);
                Err(e)
            }
        }
    }
}
