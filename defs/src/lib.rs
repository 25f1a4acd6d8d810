mod errors;
mod image;
mod provider;
mod request;
mod result;
mod schema;

pub use errors::{DeployError, FieldError, ProviderError, ValidationError};
pub use image::{ImageReference, ImageReferenceError};
pub use provider::ProviderAdapter;
pub use request::{
    AwsCredentials, DeploymentRequest, EcsTarget, KubernetesCredentials, KubernetesTarget,
    LaunchType, Provider, ProviderTarget, WorkloadKind, DEFAULT_ECS_CPU, DEFAULT_ECS_MEMORY,
    DEFAULT_NAMESPACE,
};
pub use result::{DeploymentResult, DeploymentStatus};
pub use schema::{CredentialsPayload, DeploymentForm, DeploymentPayload};
