use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ImageReference;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_ECS_CPU: &str = "256";
pub const DEFAULT_ECS_MEMORY: &str = "512";

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kubernetes,
    Ecs,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Kubernetes => "kubernetes",
            Provider::Ecs => "ecs",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Provider::Kubernetes),
            "ecs" | "aws-ecs" | "aws_ecs" => Ok(Provider::Ecs),
            other => Err(format!(
                "unknown provider '{}', expected 'kubernetes' or 'ecs'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkloadKind {
    #[default]
    Deployment,
    Pod,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::Pod => "pod",
        }
    }
}

impl FromStr for WorkloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deployment" => Ok(WorkloadKind::Deployment),
            "pod" => Ok(WorkloadKind::Pod),
            other => Err(format!(
                "unknown workload kind '{}', expected 'deployment' or 'pod'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchType {
    #[default]
    Fargate,
    Ec2,
}

impl LaunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchType::Fargate => "fargate",
            LaunchType::Ec2 => "ec2",
        }
    }
}

impl FromStr for LaunchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fargate" => Ok(LaunchType::Fargate),
            "ec2" => Ok(LaunchType::Ec2),
            other => Err(format!(
                "unknown launch type '{}', expected 'fargate' or 'ec2'",
                other
            )),
        }
    }
}

/// Where the Kubernetes adapter gets its cluster credentials from. Only
/// `Default` lets the gateway fall back to its own configuration.
#[derive(Debug)]
pub enum KubernetesCredentials {
    Kubeconfig {
        blob: SecretString,
        context: Option<String>,
    },
    KubeconfigPath {
        path: PathBuf,
        context: Option<String>,
    },
    Default,
}

impl KubernetesCredentials {
    /// Label for logs; never includes the credential material.
    pub fn source(&self) -> &'static str {
        match self {
            KubernetesCredentials::Kubeconfig { .. } => "request kubeconfig",
            KubernetesCredentials::KubeconfigPath { .. } => "request kubeconfig path",
            KubernetesCredentials::Default => "gateway default",
        }
    }
}

#[derive(Debug)]
pub struct AwsCredentials {
    pub access_key_id: SecretString,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
    pub region: String,
}

#[derive(Debug)]
pub struct KubernetesTarget {
    pub credentials: KubernetesCredentials,
    pub namespace: String,
    pub workload_kind: WorkloadKind,
    pub replicas: i32,
}

#[derive(Debug)]
pub struct EcsTarget {
    pub credentials: AwsCredentials,
    pub cluster: String,
    pub launch_type: LaunchType,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
    pub cpu: String,
    pub memory: String,
    pub desired_count: i32,
    pub execution_role_arn: Option<String>,
}

#[derive(Debug)]
pub enum ProviderTarget {
    Kubernetes(KubernetesTarget),
    Ecs(EcsTarget),
}

/// A validated deployment request. Lives for a single request/response cycle.
#[derive(Debug)]
pub struct DeploymentRequest {
    pub image: ImageReference,
    pub port: u16,
    pub target_identifier: String,
    pub target: ProviderTarget,
}

impl DeploymentRequest {
    pub fn provider(&self) -> Provider {
        match self.target {
            ProviderTarget::Kubernetes(_) => Provider::Kubernetes,
            ProviderTarget::Ecs(_) => Provider::Ecs,
        }
    }

    pub fn kubernetes_target(&self) -> Option<&KubernetesTarget> {
        match &self.target {
            ProviderTarget::Kubernetes(target) => Some(target),
            _ => None,
        }
    }

    pub fn ecs_target(&self) -> Option<&EcsTarget> {
        match &self.target {
            ProviderTarget::Ecs(target) => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentRequest {
    /// Request context for logs: provider, target, image and port only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider={} target={} image={} port={}",
            self.provider(),
            self.target_identifier,
            self.image,
            self.port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_provider_parsing_accepts_aliases() {
        assert_eq!("Kubernetes".parse::<Provider>(), Ok(Provider::Kubernetes));
        assert_eq!(" k8s ".parse::<Provider>(), Ok(Provider::Kubernetes));
        assert_eq!("aws-ecs".parse::<Provider>(), Ok(Provider::Ecs));
        assert!("gke".parse::<Provider>().is_err());
    }

    #[test]
    fn test_request_display_never_contains_secrets() {
        let request = DeploymentRequest {
            image: "nginx:1.25".parse().unwrap(),
            port: 8080,
            target_identifier: "web".to_string(),
            target: ProviderTarget::Ecs(EcsTarget {
                credentials: AwsCredentials {
                    access_key_id: SecretString::from("AKIAEXAMPLE".to_string()),
                    secret_access_key: SecretString::from("very-secret".to_string()),
                    session_token: None,
                    region: "eu-west-1".to_string(),
                },
                cluster: "main".to_string(),
                launch_type: LaunchType::Fargate,
                subnets: vec!["subnet-1".to_string()],
                security_groups: vec![],
                assign_public_ip: false,
                cpu: DEFAULT_ECS_CPU.to_string(),
                memory: DEFAULT_ECS_MEMORY.to_string(),
                desired_count: 1,
                execution_role_arn: None,
            }),
        };

        assert_eq!(
            request.to_string(),
            "provider=ecs target=web image=nginx:1.25 port=8080"
        );
        let debug = format!("{:?}", request);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("AKIAEXAMPLE"));
    }
}
