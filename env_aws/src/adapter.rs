use async_trait::async_trait;
use deploy_defs::{
    DeployError, DeploymentRequest, DeploymentResult, LaunchType, Provider, ProviderAdapter,
    ValidationError,
};
use deploy_utils::{is_ecs_cluster_reference, is_ecs_resource_name};

use crate::{
    build_service, build_task_definition, task_definition_revision, AwsEcsApi, EcsApi,
};

const NAME_RULE: &str = "must be 1-255 characters of letters, numbers, '-' and '_'";

/// Deploys a request as an ECS service: a fresh task definition revision,
/// then a service created or updated to run it.
pub struct EcsAdapter<E: EcsApi = AwsEcsApi> {
    api: E,
}

impl<E: EcsApi> EcsAdapter<E> {
    pub fn new(api: E) -> Self {
        EcsAdapter { api }
    }
}

#[async_trait]
impl<E: EcsApi> ProviderAdapter for EcsAdapter<E> {
    fn provider(&self) -> Provider {
        Provider::Ecs
    }

    fn validate(&self, request: &DeploymentRequest) -> Result<(), ValidationError> {
        let Some(target) = request.ecs_target() else {
            return Err(ValidationError::field(
                "provider",
                format!("expected an ecs target, got {}", request.provider()),
            ));
        };

        let mut errors = ValidationError::default();
        if !is_ecs_resource_name(&request.target_identifier) {
            errors.push("target_identifier", NAME_RULE);
        }
        if !is_ecs_cluster_reference(&target.cluster) {
            errors.push("cluster", format!("{}, or a cluster ARN", NAME_RULE));
        }
        if target.launch_type == LaunchType::Fargate && target.subnets.is_empty() {
            errors.push("subnets", "fargate services need at least one subnet");
        }
        errors.into_result()
    }

    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentResult, DeployError> {
        let target = request.ecs_target().ok_or_else(|| {
            DeployError::Internal("ECS adapter received a non-ecs request".to_string())
        })?;

        let task_definition = build_task_definition(request, target);
        log::info!(
            "Registering task definition {} in {} ({})",
            task_definition.family,
            target.credentials.region,
            request
        );
        let task_definition_arn = self
            .api
            .register_task_definition(&target.credentials, &task_definition)
            .await?;

        let service = build_service(request, target, &task_definition_arn);
        let service_arn = self
            .api
            .upsert_service(&target.credentials, &service)
            .await?;

        Ok(DeploymentResult::success(
            format!(
                "Service {} on cluster {} is running task definition {}",
                service.service_name,
                service.cluster,
                task_definition_revision(&task_definition_arn)
            ),
            service_arn,
        ))
    }
}
