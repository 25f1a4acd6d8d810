use deploy_defs::{DeploymentRequest, KubernetesTarget, WorkloadKind};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

pub const MANAGED_BY: &str = "deployment-gateway";

/// A single workload object ready to be submitted to the cluster.
#[derive(Debug, Clone)]
pub enum Workload {
    Deployment(Deployment),
    Pod(Pod),
}

impl Workload {
    pub fn kind(&self) -> &'static str {
        match self {
            Workload::Deployment(_) => "deployment",
            Workload::Pod(_) => "pod",
        }
    }

    pub fn name(&self) -> &str {
        let metadata = match self {
            Workload::Deployment(deployment) => &deployment.metadata,
            Workload::Pod(pod) => &pod.metadata,
        };
        metadata.name.as_deref().unwrap_or_default()
    }
}

fn labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), name.to_string()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
    ])
}

fn pod_spec(request: &DeploymentRequest) -> PodSpec {
    PodSpec {
        containers: vec![Container {
            name: request.target_identifier.clone(),
            image: Some(request.image.to_string()),
            ports: Some(vec![ContainerPort {
                container_port: i32::from(request.port),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn build_workload(request: &DeploymentRequest, target: &KubernetesTarget) -> Workload {
    let name = &request.target_identifier;
    let metadata = ObjectMeta {
        name: Some(name.clone()),
        namespace: Some(target.namespace.clone()),
        labels: Some(labels(name)),
        ..Default::default()
    };

    match target.workload_kind {
        WorkloadKind::Pod => Workload::Pod(Pod {
            metadata,
            spec: Some(pod_spec(request)),
            ..Default::default()
        }),
        WorkloadKind::Deployment => Workload::Deployment(Deployment {
            metadata,
            spec: Some(DeploymentSpec {
                replicas: Some(target.replicas),
                selector: LabelSelector {
                    match_labels: Some(BTreeMap::from([("app".to_string(), name.clone())])),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels(name)),
                        ..Default::default()
                    }),
                    spec: Some(pod_spec(request)),
                },
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}
