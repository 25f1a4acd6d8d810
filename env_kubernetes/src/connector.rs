use async_trait::async_trait;
use deploy_defs::{KubernetesCredentials, ProviderError};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};

use crate::Workload;

/// Submits workloads to a cluster on behalf of a single request.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Creates `workload` in `namespace` and returns the name the cluster
    /// stored it under.
    async fn create_workload(
        &self,
        credentials: &KubernetesCredentials,
        namespace: &str,
        workload: &Workload,
    ) -> Result<String, ProviderError>;
}

/// A connector backed by `kube`. A new client is built for every call from
/// the request's own credentials.
///
/// Kubeconfigs that arrive with a request may not point at local files or
/// run commands, and request paths are only read from `kubeconfig_dir`.
/// Load failures are reported without the file or blob contents.
#[derive(Debug, Clone, Default)]
pub struct KubeConnector {
    default_kubeconfig: Option<PathBuf>,
    kubeconfig_dir: Option<PathBuf>,
}

impl KubeConnector {
    pub fn new(default_kubeconfig: Option<PathBuf>) -> Self {
        KubeConnector {
            default_kubeconfig,
            kubeconfig_dir: None,
        }
    }

    /// Lets requests name kubeconfig files that live under `dir`.
    pub fn with_kubeconfig_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kubeconfig_dir = Some(dir.into());
        self
    }

    async fn client_for(&self, credentials: &KubernetesCredentials) -> Result<Client, ProviderError> {
        let config = match credentials {
            KubernetesCredentials::Kubeconfig { blob, context } => {
                let kubeconfig = Kubeconfig::from_yaml(blob.expose_secret()).map_err(|_| {
                    log::debug!("Inline kubeconfig could not be parsed");
                    ProviderError::Credentials("invalid kubeconfig".to_string())
                })?;
                reject_local_references(&kubeconfig)?;
                config_from_kubeconfig(kubeconfig, context.clone()).await?
            }
            KubernetesCredentials::KubeconfigPath { path, context } => {
                let resolved = self.resolve_request_path(path)?;
                let kubeconfig = read_kubeconfig(&resolved, "kubeconfig")?;
                reject_local_references(&kubeconfig)?;
                config_from_kubeconfig(kubeconfig, context.clone()).await?
            }
            KubernetesCredentials::Default => match &self.default_kubeconfig {
                Some(path) => {
                    let kubeconfig = read_kubeconfig(path, "default kubeconfig")?;
                    config_from_kubeconfig(kubeconfig, None).await?
                }
                None => Config::infer().await.map_err(|e| {
                    ProviderError::Credentials(format!(
                        "no credentials supplied and no cluster configuration found: {}",
                        e
                    ))
                })?,
            },
        };

        Client::try_from(config).map_err(|e| {
            ProviderError::Credentials(format!("could not build a cluster client: {}", e))
        })
    }

    /// Resolves a request supplied path against `kubeconfig_dir`. Symlinks
    /// and `..` segments are followed before the containment check.
    fn resolve_request_path(&self, path: &Path) -> Result<PathBuf, ProviderError> {
        let Some(dir) = &self.kubeconfig_dir else {
            return Err(ProviderError::Credentials(
                "kubeconfig paths are not accepted by this gateway".to_string(),
            ));
        };
        let unavailable = || {
            ProviderError::Credentials(format!(
                "kubeconfig {} is not available to requests",
                path.display()
            ))
        };

        let dir = dir.canonicalize().map_err(|e| {
            log::warn!("Kubeconfig directory {} is unusable: {}", dir.display(), e);
            unavailable()
        })?;
        let resolved = dir.join(path).canonicalize().map_err(|_| unavailable())?;
        if resolved.starts_with(&dir) && resolved.is_file() {
            Ok(resolved)
        } else {
            Err(unavailable())
        }
    }
}

fn read_kubeconfig(path: &Path, label: &str) -> Result<Kubeconfig, ProviderError> {
    Kubeconfig::read_from(path).map_err(|_| {
        log::debug!("Could not load {} {}", label, path.display());
        ProviderError::Credentials(format!("could not load {} {}", label, path.display()))
    })
}

/// Request kubeconfigs must carry their credentials inline. Anything that
/// makes `kube` read a local file or spawn a process is refused.
fn reject_local_references(kubeconfig: &Kubeconfig) -> Result<(), ProviderError> {
    for named in &kubeconfig.auth_infos {
        let Some(user) = &named.auth_info else {
            continue;
        };
        let refused = [
            ("exec", user.exec.is_some()),
            ("auth-provider", user.auth_provider.is_some()),
            ("tokenFile", user.token_file.is_some()),
            ("client-certificate", user.client_certificate.is_some()),
            ("client-key", user.client_key.is_some()),
        ]
        .into_iter()
        .find_map(|(field, present)| present.then_some(field));

        if let Some(field) = refused {
            return Err(ProviderError::Credentials(format!(
                "user '{}' uses {}, which request kubeconfigs may not use",
                named.name, field
            )));
        }
    }

    for named in &kubeconfig.clusters {
        if named
            .cluster
            .as_ref()
            .is_some_and(|cluster| cluster.certificate_authority.is_some())
        {
            return Err(ProviderError::Credentials(format!(
                "cluster '{}' uses certificate-authority, which request kubeconfigs may not use",
                named.name
            )));
        }
    }

    Ok(())
}

async fn config_from_kubeconfig(
    kubeconfig: Kubeconfig,
    context: Option<String>,
) -> Result<Config, ProviderError> {
    let options = KubeConfigOptions {
        context,
        ..Default::default()
    };
    Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| {
            log::debug!("Kubeconfig could not be resolved: {}", e);
            ProviderError::Credentials("unusable kubeconfig".to_string())
        })
}

pub fn map_kube_error(error: kube::Error) -> ProviderError {
    match error {
        kube::Error::Api(response) => match response.code {
            409 => ProviderError::Conflict(response.message),
            401 | 403 => ProviderError::Unauthorized(response.message),
            code => ProviderError::Api(format!("{} ({}): {}", response.reason, code, response.message)),
        },
        kube::Error::Auth(e) => ProviderError::Credentials(e.to_string()),
        kube::Error::InferConfig(e) => ProviderError::Credentials(e.to_string()),
        other => ProviderError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn create_workload(
        &self,
        credentials: &KubernetesCredentials,
        namespace: &str,
        workload: &Workload,
    ) -> Result<String, ProviderError> {
        log::debug!(
            "Connecting to cluster using {} for {} {}/{}",
            credentials.source(),
            workload.kind(),
            namespace,
            workload.name()
        );
        let client = self.client_for(credentials).await?;
        let params = PostParams::default();

        let created_name = match workload {
            Workload::Deployment(deployment) => {
                let api: Api<Deployment> = Api::namespaced(client, namespace);
                api.create(&params, deployment)
                    .await
                    .map_err(map_kube_error)?
                    .metadata
                    .name
            }
            Workload::Pod(pod) => {
                let api: Api<Pod> = Api::namespaced(client, namespace);
                api.create(&params, pod)
                    .await
                    .map_err(map_kube_error)?
                    .metadata
                    .name
            }
        };

        Ok(created_name.unwrap_or_else(|| workload.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_map_conflict() {
        assert_eq!(
            map_kube_error(api_error(409, "AlreadyExists", "deployments.apps \"web\" already exists")),
            ProviderError::Conflict("deployments.apps \"web\" already exists".to_string())
        );
    }

    #[test]
    fn test_map_unauthorized() {
        assert!(matches!(
            map_kube_error(api_error(401, "Unauthorized", "Unauthorized")),
            ProviderError::Unauthorized(_)
        ));
        assert!(matches!(
            map_kube_error(api_error(403, "Forbidden", "deployments.apps is forbidden")),
            ProviderError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_map_other_api_errors() {
        assert_eq!(
            map_kube_error(api_error(422, "Invalid", "spec.template: Invalid value")),
            ProviderError::Api("Invalid (422): spec.template: Invalid value".to_string())
        );
    }

    const CA_DATA: &str = "LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0tCk1JSUJrVENDQVRlZ0F3SUJBZ0lVSFYzRkI3SmhPc0dnN3ZBVXVveWJsU240Qms0d0NnWUlLb1pJemowRUF3SXcKSFRFYk1Ca0dBMVVFQXd3U2EzVmlaWEp1WlhSbGN5MTBaWE4wTFdOaE1DQVhEVEkyTVRBeE5qQTNOVFl5TTFvWQpEekl4TWpZd09USXlNRGMxTmpJeldqQWRNUnN3R1FZRFZRUUREQkpyZFdKbGNtNWxkR1Z6TFhSbGMzUXRZMkV3CldUQVRCZ2NxaGtqT1BRSUJCZ2dxaGtqT1BRTUJCd05DQUFSYkZKY242YTdDZVNGSmxUMXpwWjE4TG9UUzBPK1gKbkZTMFJ5NHJsaytUWTBOcFF4VlNHL2NZYzNCTmJ1VU5ZTUVrWGtpNVpVV2pzaklJdXlyeURzM1dvMU13VVRBZApCZ05WSFE0RUZnUVVtY2QwTm1NRzRBZjVWWm50TlB6US8xSjJUT0F3SHdZRFZSMGpCQmd3Rm9BVW1jZDBObU1HCjRBZjVWWm50TlB6US8xSjJUT0F3RHdZRFZSMFRBUUgvQkFVd0F3RUIvekFLQmdncWhrak9QUVFEQWdOSUFEQkYKQWlBbG0xK1ZKQSt4WjNoa0p3WllmcXU2YWUxS294TXU2bTlIQXF4bmJ5cVJhZ0loQVBtZHpBVkJWZ210Y1laawpJVXpYS3RUT1VjL1R3ZUthaVlPamdjblhHT3ZzCi0tLS0tRU5EIENFUlRJRklDQVRFLS0tLS0K";

    fn kubeconfig_with_user(user: &str) -> String {
        format!(
            r#"apiVersion: v1
kind: Config
clusters:
- name: staging
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority-data: {}
users:
- name: deployer
  user:
{}
contexts:
- name: staging
  context:
    cluster: staging
    user: deployer
current-context: staging
"#,
            CA_DATA, user
        )
    }

    fn inline(blob: String) -> KubernetesCredentials {
        KubernetesCredentials::Kubeconfig {
            blob: SecretString::from(blob),
            context: None,
        }
    }

    fn secret_file(dir: &Path) -> PathBuf {
        let path = dir.join("secret.txt");
        std::fs::write(&path, "db_password=hunter2\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_malformed_kubeconfig_is_a_credentials_error() {
        let connector = KubeConnector::new(None);
        let credentials = inline("clusters: [not, a, kubeconfig".to_string());

        let error = connector.client_for(&credentials).await.unwrap_err();
        assert!(matches!(error, ProviderError::Credentials(_)));
    }

    #[tokio::test]
    async fn test_malformed_kubeconfig_error_omits_blob_contents() {
        let connector = KubeConnector::new(None);
        let credentials = inline("users:\n- name: admin\n  user: db_password=hunter2\n".to_string());

        let error = connector.client_for(&credentials).await.unwrap_err();
        assert_eq!(error, ProviderError::Credentials("invalid kubeconfig".to_string()));
    }

    #[tokio::test]
    async fn test_inline_kubeconfig_is_used_over_the_default() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let connector = KubeConnector::new(Some(PathBuf::from("/nonexistent/default")));
        let credentials = inline(kubeconfig_with_user("    token: staging-token"));

        assert!(connector.client_for(&credentials).await.is_ok());
    }

    #[tokio::test]
    async fn test_default_credentials_read_the_default_kubeconfig() {
        let connector = KubeConnector::new(Some(PathBuf::from("/nonexistent/default")));

        let error = connector
            .client_for(&KubernetesCredentials::Default)
            .await
            .unwrap_err();
        assert_eq!(
            error,
            ProviderError::Credentials("could not load default kubeconfig /nonexistent/default".to_string())
        );
    }

    #[tokio::test]
    async fn test_unparseable_default_kubeconfig_error_omits_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let connector = KubeConnector::new(Some(secret_file(dir.path())));

        let error = connector
            .client_for(&KubernetesCredentials::Default)
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::Credentials(_)));
        assert!(!error.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_exec_kubeconfig_is_refused_without_running_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let exec = format!(
            r#"    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      command: /bin/sh
      args: ["-c", "touch {}"]"#,
            marker.display()
        );
        let connector = KubeConnector::new(None);

        let error = connector
            .client_for(&inline(kubeconfig_with_user(&exec)))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            ProviderError::Credentials(
                "user 'deployer' uses exec, which request kubeconfigs may not use".to_string()
            )
        );
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_file_references_in_request_kubeconfigs_are_refused() {
        let connector = KubeConnector::new(None);

        for user in [
            "    tokenFile: /var/run/secrets/kubernetes.io/serviceaccount/token",
            "    client-certificate: /etc/kubernetes/pki/admin.crt",
            "    client-key: /etc/kubernetes/pki/admin.key",
        ] {
            let error = connector
                .client_for(&inline(kubeconfig_with_user(user)))
                .await
                .unwrap_err();
            assert!(
                error.to_string().contains("request kubeconfigs may not use"),
                "{}",
                error
            );
        }

        let ca_file = kubeconfig_with_user("    token: staging-token").replace(
            &format!("certificate-authority-data: {}", CA_DATA),
            "certificate-authority: /etc/kubernetes/pki/ca.crt",
        );
        let error = connector.client_for(&inline(ca_file)).await.unwrap_err();
        assert!(error.to_string().contains("certificate-authority"));
    }

    #[tokio::test]
    async fn test_kubeconfig_paths_need_a_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let connector = KubeConnector::new(None);
        let credentials = KubernetesCredentials::KubeconfigPath {
            path: secret_file(dir.path()),
            context: None,
        };

        let error = connector.client_for(&credentials).await.unwrap_err();
        assert_eq!(
            error,
            ProviderError::Credentials("kubeconfig paths are not accepted by this gateway".to_string())
        );
    }

    #[tokio::test]
    async fn test_kubeconfig_paths_outside_the_directory_are_refused() {
        let allowed = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let secret = secret_file(elsewhere.path());
        let connector = KubeConnector::new(None).with_kubeconfig_dir(allowed.path());

        let escape = Path::new("..")
            .join(elsewhere.path().file_name().unwrap())
            .join("secret.txt");

        for path in [secret, escape] {
            let credentials = KubernetesCredentials::KubeconfigPath { path, context: None };
            let error = connector.client_for(&credentials).await.unwrap_err();
            assert!(error.to_string().contains("is not available to requests"), "{}", error);
            assert!(!error.to_string().contains("hunter2"));
        }
    }

    #[tokio::test]
    async fn test_unparseable_kubeconfig_in_directory_omits_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        secret_file(dir.path());
        let connector = KubeConnector::new(None).with_kubeconfig_dir(dir.path());
        let credentials = KubernetesCredentials::KubeconfigPath {
            path: PathBuf::from("secret.txt"),
            context: Some("staging".to_string()),
        };

        let error = connector.client_for(&credentials).await.unwrap_err();
        assert!(matches!(error, ProviderError::Credentials(_)));
        assert!(error.to_string().contains("could not load kubeconfig"));
        assert!(!error.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_path_is_a_credentials_error() {
        let dir = tempfile::tempdir().unwrap();
        let connector = KubeConnector::new(None).with_kubeconfig_dir(dir.path());
        let credentials = KubernetesCredentials::KubeconfigPath {
            path: PathBuf::from("staging.yaml"),
            context: Some("staging".to_string()),
        };

        let error = connector.client_for(&credentials).await.unwrap_err();
        assert!(matches!(error, ProviderError::Credentials(_)));
        assert!(error.to_string().contains("staging.yaml"));
    }
}
