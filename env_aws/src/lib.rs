mod adapter;
mod ecs_api;
mod task;

pub use adapter::EcsAdapter;
pub use ecs_api::{classify_error, map_sdk_error, AwsEcsApi, EcsApi};
pub use task::{
    build_service, build_task_definition, task_definition_revision, AwsVpcSpec, NetworkMode,
    ServiceSpec, TaskDefinitionSpec,
};
