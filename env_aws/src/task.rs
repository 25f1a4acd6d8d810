use deploy_defs::{DeploymentRequest, EcsTarget, LaunchType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    Awsvpc,
    Bridge,
}

/// What gets registered as a new task definition revision.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinitionSpec {
    pub family: String,
    pub container_name: String,
    pub image: String,
    pub container_port: i32,
    pub network_mode: NetworkMode,
    pub launch_type: LaunchType,
    pub cpu: String,
    pub memory: String,
    pub execution_role_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AwsVpcSpec {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    pub cluster: String,
    pub service_name: String,
    pub task_definition_arn: String,
    pub desired_count: i32,
    pub launch_type: LaunchType,
    /// Only set for awsvpc task definitions.
    pub network: Option<AwsVpcSpec>,
}

pub fn build_task_definition(request: &DeploymentRequest, target: &EcsTarget) -> TaskDefinitionSpec {
    let network_mode = match target.launch_type {
        LaunchType::Fargate => NetworkMode::Awsvpc,
        LaunchType::Ec2 => NetworkMode::Bridge,
    };

    TaskDefinitionSpec {
        family: request.target_identifier.clone(),
        container_name: request.target_identifier.clone(),
        image: request.image.to_string(),
        container_port: i32::from(request.port),
        network_mode,
        launch_type: target.launch_type,
        cpu: target.cpu.clone(),
        memory: target.memory.clone(),
        execution_role_arn: target.execution_role_arn.clone(),
    }
}

pub fn build_service(
    request: &DeploymentRequest,
    target: &EcsTarget,
    task_definition_arn: &str,
) -> ServiceSpec {
    let network = match target.launch_type {
        LaunchType::Fargate => Some(AwsVpcSpec {
            subnets: target.subnets.clone(),
            security_groups: target.security_groups.clone(),
            assign_public_ip: target.assign_public_ip,
        }),
        LaunchType::Ec2 => None,
    };

    ServiceSpec {
        cluster: target.cluster.clone(),
        service_name: request.target_identifier.clone(),
        task_definition_arn: task_definition_arn.to_string(),
        desired_count: target.desired_count,
        launch_type: target.launch_type,
        network,
    }
}

/// `family:revision` from a task definition ARN, or the ARN itself.
pub fn task_definition_revision(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}
