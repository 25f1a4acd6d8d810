use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Compatibility, ContainerDefinition, NetworkConfiguration,
    PortMapping, TransportProtocol,
};
use deploy_defs::{AwsCredentials, LaunchType, ProviderError};
use secrecy::ExposeSecret;

use crate::task::{AwsVpcSpec, NetworkMode, ServiceSpec, TaskDefinitionSpec};

const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDeniedException",
    "AccessDenied",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "ExpiredTokenException",
];

/// The ECS calls a deployment needs, each made with the request's own
/// credentials.
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Registers a new revision and returns its ARN.
    async fn register_task_definition(
        &self,
        credentials: &AwsCredentials,
        spec: &TaskDefinitionSpec,
    ) -> Result<String, ProviderError>;

    /// Points an existing active service at `task_definition_arn`, or
    /// creates the service. Returns the service ARN.
    async fn upsert_service(
        &self,
        credentials: &AwsCredentials,
        spec: &ServiceSpec,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Default)]
pub struct AwsEcsApi;

impl AwsEcsApi {
    pub fn new() -> Self {
        AwsEcsApi
    }

    fn client(&self, credentials: &AwsCredentials) -> aws_sdk_ecs::Client {
        let creds = Credentials::new(
            credentials.access_key_id.expose_secret(),
            credentials.secret_access_key.expose_secret(),
            credentials
                .session_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            None,
            "DeploymentRequest",
        );

        let config = aws_config::SdkConfig::builder()
            .credentials_provider(SharedCredentialsProvider::new(creds))
            .region(aws_config::Region::new(credentials.region.clone()))
            .behavior_version(aws_config::BehaviorVersion::latest())
            .build();

        aws_sdk_ecs::Client::new(&config)
    }
}

/// Sorts a provider failure by what the caller can do about it.
pub fn classify_error(code: Option<&str>, transport: bool, detail: String) -> ProviderError {
    if transport {
        return ProviderError::Transport(detail);
    }
    match code {
        Some(code) if UNAUTHORIZED_CODES.contains(&code) => ProviderError::Unauthorized(detail),
        _ => ProviderError::Api(detail),
    }
}

pub fn map_sdk_error<E, R>(operation: &str, error: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let transport = matches!(
        error,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    );
    let code = error.as_service_error().and_then(|e| e.code()).map(str::to_string);
    classify_error(
        code.as_deref(),
        transport,
        format!("{} failed: {}", operation, DisplayErrorContext(&error)),
    )
}

fn sdk_launch_type(launch_type: LaunchType) -> aws_sdk_ecs::types::LaunchType {
    match launch_type {
        LaunchType::Fargate => aws_sdk_ecs::types::LaunchType::Fargate,
        LaunchType::Ec2 => aws_sdk_ecs::types::LaunchType::Ec2,
    }
}

fn network_configuration(network: &AwsVpcSpec) -> Result<NetworkConfiguration, ProviderError> {
    let assign_public_ip = if network.assign_public_ip {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };

    let awsvpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(network.subnets.clone()))
        .set_security_groups(Some(network.security_groups.clone()))
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|e| ProviderError::Api(format!("invalid network configuration: {}", e)))?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(awsvpc)
        .build())
}

#[async_trait]
impl EcsApi for AwsEcsApi {
    async fn register_task_definition(
        &self,
        credentials: &AwsCredentials,
        spec: &TaskDefinitionSpec,
    ) -> Result<String, ProviderError> {
        let client = self.client(credentials);

        let container = ContainerDefinition::builder()
            .name(&spec.container_name)
            .image(&spec.image)
            .essential(true)
            .port_mappings(
                PortMapping::builder()
                    .container_port(spec.container_port)
                    .protocol(TransportProtocol::Tcp)
                    .build(),
            )
            .build();

        let (network_mode, compatibility) = match spec.network_mode {
            NetworkMode::Awsvpc => (aws_sdk_ecs::types::NetworkMode::Awsvpc, Compatibility::Fargate),
            NetworkMode::Bridge => (aws_sdk_ecs::types::NetworkMode::Bridge, Compatibility::Ec2),
        };

        let output = client
            .register_task_definition()
            .family(&spec.family)
            .network_mode(network_mode)
            .requires_compatibilities(compatibility)
            .cpu(&spec.cpu)
            .memory(&spec.memory)
            .set_execution_role_arn(spec.execution_role_arn.clone())
            .container_definitions(container)
            .send()
            .await
            .map_err(|e| map_sdk_error("RegisterTaskDefinition", e))?;

        output
            .task_definition()
            .and_then(|t| t.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Api("No task definition ARN returned".to_string()))
    }

    async fn upsert_service(
        &self,
        credentials: &AwsCredentials,
        spec: &ServiceSpec,
    ) -> Result<String, ProviderError> {
        let client = self.client(credentials);

        let described = client
            .describe_services()
            .cluster(&spec.cluster)
            .services(&spec.service_name)
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeServices", e))?;

        let active = described
            .services()
            .iter()
            .any(|service| service.status() == Some("ACTIVE"));

        let service = if active {
            log::info!(
                "Updating service {} on cluster {}",
                spec.service_name,
                spec.cluster
            );
            client
                .update_service()
                .cluster(&spec.cluster)
                .service(&spec.service_name)
                .task_definition(&spec.task_definition_arn)
                .desired_count(spec.desired_count)
                .send()
                .await
                .map_err(|e| map_sdk_error("UpdateService", e))?
                .service
        } else {
            log::info!(
                "Creating service {} on cluster {}",
                spec.service_name,
                spec.cluster
            );
            let network = spec.network.as_ref().map(network_configuration).transpose()?;
            client
                .create_service()
                .cluster(&spec.cluster)
                .service_name(&spec.service_name)
                .task_definition(&spec.task_definition_arn)
                .desired_count(spec.desired_count)
                .launch_type(sdk_launch_type(spec.launch_type))
                .set_network_configuration(network)
                .send()
                .await
                .map_err(|e| map_sdk_error("CreateService", e))?
                .service
        };

        service
            .and_then(|s| s.service_arn)
            .ok_or_else(|| ProviderError::Api("No service ARN returned".to_string()))
    }
}
