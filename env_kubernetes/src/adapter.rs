use async_trait::async_trait;
use deploy_defs::{
    DeployError, DeploymentRequest, DeploymentResult, Provider, ProviderAdapter, ValidationError,
};
use deploy_utils::is_rfc1123_label;

use crate::{build_workload, ClusterConnector, KubeConnector};

const LABEL_RULE: &str =
    "must be a lowercase RFC 1123 label: at most 63 characters of a-z, 0-9 and '-', starting and ending with an alphanumeric";

pub struct KubernetesAdapter<C: ClusterConnector = KubeConnector> {
    connector: C,
}

impl<C: ClusterConnector> KubernetesAdapter<C> {
    pub fn new(connector: C) -> Self {
        KubernetesAdapter { connector }
    }
}

#[async_trait]
impl<C: ClusterConnector> ProviderAdapter for KubernetesAdapter<C> {
    fn provider(&self) -> Provider {
        Provider::Kubernetes
    }

    fn validate(&self, request: &DeploymentRequest) -> Result<(), ValidationError> {
        let Some(target) = request.kubernetes_target() else {
            return Err(ValidationError::field(
                "provider",
                format!("expected a kubernetes target, got {}", request.provider()),
            ));
        };

        let mut errors = ValidationError::default();
        if !is_rfc1123_label(&request.target_identifier) {
            errors.push("target_identifier", LABEL_RULE);
        }
        if !is_rfc1123_label(&target.namespace) {
            errors.push("namespace", LABEL_RULE);
        }
        errors.into_result()
    }

    async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentResult, DeployError> {
        let target = request.kubernetes_target().ok_or_else(|| {
            DeployError::Internal("Kubernetes adapter received a non-kubernetes request".to_string())
        })?;

        let workload = build_workload(request, target);
        log::info!(
            "Creating {} {} in namespace {} ({})",
            workload.kind(),
            workload.name(),
            target.namespace,
            request
        );

        let name = self
            .connector
            .create_workload(&target.credentials, &target.namespace, &workload)
            .await?;

        Ok(DeploymentResult::success(
            format!(
                "Created {} {} in namespace {}",
                workload.kind(),
                name,
                target.namespace
            ),
            format!("{}/{}/{}", workload.kind(), target.namespace, name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_defs::{
        KubernetesCredentials, KubernetesTarget, ProviderError, ProviderTarget, WorkloadKind,
    };
    use pretty_assertions::assert_eq;
    use secrecy::{ExposeSecret, SecretString};
    use std::sync::Mutex;

    use crate::Workload;

    #[derive(Debug, Clone, PartialEq)]
    struct Submission {
        credentials: String,
        namespace: String,
        kind: &'static str,
        name: String,
    }

    /// Records every submission and rejects names it has already seen.
    #[derive(Default)]
    struct RecordingConnector {
        submissions: Mutex<Vec<Submission>>,
    }

    #[async_trait]
    impl ClusterConnector for RecordingConnector {
        async fn create_workload(
            &self,
            credentials: &KubernetesCredentials,
            namespace: &str,
            workload: &Workload,
        ) -> Result<String, ProviderError> {
            let credentials = match credentials {
                KubernetesCredentials::Kubeconfig { blob, .. } => blob.expose_secret().to_string(),
                KubernetesCredentials::KubeconfigPath { path, .. } => path.display().to_string(),
                KubernetesCredentials::Default => "default".to_string(),
            };
            let mut submissions = self.submissions.lock().unwrap();
            if submissions
                .iter()
                .any(|s| s.namespace == namespace && s.name == workload.name())
            {
                return Err(ProviderError::Conflict(format!(
                    "{}s \"{}\" already exists",
                    workload.kind(),
                    workload.name()
                )));
            }
            submissions.push(Submission {
                credentials,
                namespace: namespace.to_string(),
                kind: workload.kind(),
                name: workload.name().to_string(),
            });
            Ok(workload.name().to_string())
        }
    }

    fn request(name: &str, credentials: KubernetesCredentials) -> DeploymentRequest {
        DeploymentRequest {
            image: "nginx:1.25".parse().unwrap(),
            port: 80,
            target_identifier: name.to_string(),
            target: ProviderTarget::Kubernetes(KubernetesTarget {
                credentials,
                namespace: "default".to_string(),
                workload_kind: WorkloadKind::Deployment,
                replicas: 1,
            }),
        }
    }

    #[tokio::test]
    async fn test_deploy_uses_request_credentials() {
        let adapter = KubernetesAdapter::new(RecordingConnector::default());
        let credentials = KubernetesCredentials::Kubeconfig {
            blob: SecretString::from("kubeconfig-A".to_string()),
            context: None,
        };

        let result = adapter.deploy(&request("web", credentials)).await.unwrap();

        assert!(result.is_success());
        assert_eq!(
            result.provider_reference.as_deref(),
            Some("deployment/default/web")
        );
        assert_eq!(
            adapter.connector.submissions.lock().unwrap().clone(),
            vec![Submission {
                credentials: "kubeconfig-A".to_string(),
                namespace: "default".to_string(),
                kind: "deployment",
                name: "web".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_second_deploy_with_same_name_conflicts() {
        let adapter = KubernetesAdapter::new(RecordingConnector::default());

        adapter
            .deploy(&request("web", KubernetesCredentials::Default))
            .await
            .unwrap();
        let error = adapter
            .deploy(&request("web", KubernetesCredentials::Default))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            DeployError::Provider(ProviderError::Conflict(_))
        ));
    }

    #[test]
    fn test_validate_rejects_invalid_names() {
        let adapter = KubernetesAdapter::new(RecordingConnector::default());
        let mut request = request("Web_App", KubernetesCredentials::Default);
        if let ProviderTarget::Kubernetes(target) = &mut request.target {
            target.namespace = "team.a".to_string();
        }

        let error = adapter.validate(&request).unwrap_err();
        let fields: Vec<&str> = error.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["target_identifier", "namespace"]);
    }

    #[test]
    fn test_validate_accepts_valid_names() {
        let adapter = KubernetesAdapter::new(RecordingConnector::default());
        assert_eq!(
            adapter.validate(&request("web-01", KubernetesCredentials::Default)),
            Ok(())
        );
    }
}
