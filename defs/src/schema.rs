use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use crate::{
    AwsCredentials, DeploymentRequest, EcsTarget, ImageReference, KubernetesCredentials,
    KubernetesTarget, LaunchType, Provider, ProviderTarget, ValidationError, WorkloadKind,
    DEFAULT_ECS_CPU, DEFAULT_ECS_MEMORY, DEFAULT_NAMESPACE,
};

const REQUIRED: &str = "field is required";

fn secret_opt<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Provider credentials as they arrive on the wire. Which fields apply
/// depends on the provider of the enclosing request.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsPayload {
    #[serde(default, deserialize_with = "secret_opt")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub kubeconfig: Option<SecretString>,
    pub kubeconfig_path: Option<String>,
    pub context: Option<String>,
    #[serde(default, alias = "aws_access_key_id", deserialize_with = "secret_opt")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub access_key_id: Option<SecretString>,
    #[serde(default, alias = "aws_secret_access_key", deserialize_with = "secret_opt")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub secret_access_key: Option<SecretString>,
    #[serde(default, deserialize_with = "secret_opt")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub session_token: Option<SecretString>,
    #[serde(alias = "aws_region")]
    pub region: Option<String>,
}

/// The JSON body of `POST /deploy` before validation. Every field is optional
/// here so that all problems can be reported at once.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Deserialize)]
pub struct DeploymentPayload {
    pub provider: Option<String>,
    #[serde(default, alias = "aws_credentials", alias = "cluster_credentials")]
    pub credentials: Option<CredentialsPayload>,
    #[serde(alias = "container_image_url")]
    pub image_reference: Option<String>,
    #[serde(alias = "port_requirements")]
    pub port: Option<i64>,
    pub target_identifier: Option<String>,
    pub namespace: Option<String>,
    pub workload_kind: Option<String>,
    pub replicas: Option<i64>,
    #[serde(alias = "ecs_cluster_name")]
    pub cluster: Option<String>,
    pub launch_type: Option<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub assign_public_ip: Option<bool>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub desired_count: Option<i64>,
    pub execution_role_arn: Option<String>,
}

/// The form-encoded body of `POST /deploy`: the same fields as
/// [`DeploymentPayload`] with credentials inlined and lists comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct DeploymentForm {
    pub provider: Option<String>,
    #[serde(alias = "container_image_url")]
    pub image_reference: Option<String>,
    #[serde(alias = "port_requirements")]
    pub port: Option<i64>,
    pub target_identifier: Option<String>,
    pub namespace: Option<String>,
    pub workload_kind: Option<String>,
    pub replicas: Option<i64>,
    #[serde(alias = "ecs_cluster_name")]
    pub cluster: Option<String>,
    pub launch_type: Option<String>,
    pub subnets: Option<String>,
    pub security_groups: Option<String>,
    pub assign_public_ip: Option<bool>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub desired_count: Option<i64>,
    pub execution_role_arn: Option<String>,
    #[serde(default, deserialize_with = "secret_opt")]
    pub kubeconfig: Option<SecretString>,
    pub kubeconfig_path: Option<String>,
    pub context: Option<String>,
    #[serde(default, alias = "aws_access_key_id", deserialize_with = "secret_opt")]
    pub access_key_id: Option<SecretString>,
    #[serde(default, alias = "aws_secret_access_key", deserialize_with = "secret_opt")]
    pub secret_access_key: Option<SecretString>,
    #[serde(default, deserialize_with = "secret_opt")]
    pub session_token: Option<SecretString>,
    #[serde(alias = "aws_region")]
    pub region: Option<String>,
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl From<DeploymentForm> for DeploymentPayload {
    fn from(form: DeploymentForm) -> Self {
        let has_credentials = form.kubeconfig.is_some()
            || form.kubeconfig_path.is_some()
            || form.access_key_id.is_some()
            || form.secret_access_key.is_some()
            || form.session_token.is_some()
            || form.region.is_some();

        let credentials = if has_credentials {
            Some(CredentialsPayload {
                kubeconfig: form.kubeconfig,
                kubeconfig_path: form.kubeconfig_path,
                context: form.context,
                access_key_id: form.access_key_id,
                secret_access_key: form.secret_access_key,
                session_token: form.session_token,
                region: form.region,
            })
        } else {
            None
        };

        DeploymentPayload {
            provider: form.provider,
            credentials,
            image_reference: form.image_reference,
            port: form.port,
            target_identifier: form.target_identifier,
            namespace: form.namespace,
            workload_kind: form.workload_kind,
            replicas: form.replicas,
            cluster: form.cluster,
            launch_type: form.launch_type,
            subnets: split_list(form.subnets),
            security_groups: split_list(form.security_groups),
            assign_public_ip: form.assign_public_ip,
            cpu: form.cpu,
            memory: form.memory,
            desired_count: form.desired_count,
            execution_role_arn: form.execution_role_arn,
        }
    }
}

/// Trims the value and treats blank strings as missing.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|v| !v.expose_secret().trim().is_empty())
}

fn required(value: Option<String>, field: &str, errors: &mut ValidationError) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        errors.push(field, REQUIRED);
    }
    value
}

fn parse_or_default<T>(value: Option<String>, field: &str, errors: &mut ValidationError) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    match non_blank(value).map(|v| v.parse::<T>()) {
        None => T::default(),
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            errors.push(field, e);
            T::default()
        }
    }
}

fn count(value: Option<i64>, field: &str, errors: &mut ValidationError) -> i32 {
    match value.map(i32::try_from) {
        None => 1,
        Some(Ok(n)) if n >= 0 => n,
        _ => {
            errors.push(field, "must be between 0 and 2147483647");
            1
        }
    }
}

impl DeploymentPayload {
    /// The raw provider and target as sent, for log lines about requests
    /// that may not validate.
    pub fn describe(&self) -> String {
        let raw = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or("-")
                .to_string()
        };
        format!(
            "provider={} target={}",
            raw(&self.provider),
            raw(&self.target_identifier)
        )
    }

    /// Turn the payload into a [`DeploymentRequest`], reporting every
    /// offending field at once.
    pub fn validate(mut self) -> Result<DeploymentRequest, ValidationError> {
        let mut errors = ValidationError::default();

        let provider = match non_blank(self.provider.take()) {
            None => {
                errors.push("provider", REQUIRED);
                None
            }
            Some(raw) => match raw.parse::<Provider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    errors.push("provider", e);
                    None
                }
            },
        };

        let image = required(self.image_reference.take(), "image_reference", &mut errors)
            .and_then(|raw| match ImageReference::parse(&raw) {
                Ok(image) => Some(image),
                Err(e) => {
                    errors.push("image_reference", e.to_string());
                    None
                }
            });

        let port = match self.port {
            None => {
                errors.push("port", REQUIRED);
                None
            }
            Some(raw) => match u16::try_from(raw) {
                Ok(port) if port != 0 => Some(port),
                _ => {
                    errors.push(
                        "port",
                        format!("must be between 1 and 65535, got {}", raw),
                    );
                    None
                }
            },
        };

        let target_identifier =
            required(self.target_identifier.take(), "target_identifier", &mut errors);

        let target = match provider {
            Some(Provider::Kubernetes) => self.kubernetes_target(&mut errors),
            Some(Provider::Ecs) => self.ecs_target(&mut errors),
            None => None,
        };

        match (image, port, target_identifier, target) {
            (Some(image), Some(port), Some(target_identifier), Some(target))
                if errors.is_empty() =>
            {
                Ok(DeploymentRequest {
                    image,
                    port,
                    target_identifier,
                    target,
                })
            }
            _ => Err(errors),
        }
    }

    fn kubernetes_target(&mut self, errors: &mut ValidationError) -> Option<ProviderTarget> {
        let credentials = match self.credentials.take() {
            None => Some(KubernetesCredentials::Default),
            Some(payload) => {
                let context = non_blank(payload.context);
                match (non_blank_secret(payload.kubeconfig), non_blank(payload.kubeconfig_path)) {
                    (Some(_), Some(_)) => {
                        errors.push(
                            "credentials",
                            "supply either kubeconfig or kubeconfig_path, not both",
                        );
                        None
                    }
                    (Some(blob), None) => Some(KubernetesCredentials::Kubeconfig { blob, context }),
                    (None, Some(path)) => Some(KubernetesCredentials::KubeconfigPath {
                        path: PathBuf::from(path),
                        context,
                    }),
                    (None, None) => Some(KubernetesCredentials::Default),
                }
            }
        };

        let namespace =
            non_blank(self.namespace.take()).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let workload_kind: WorkloadKind =
            parse_or_default(self.workload_kind.take(), "workload_kind", errors);

        if workload_kind == WorkloadKind::Pod && self.replicas.is_some_and(|r| r != 1) {
            errors.push("replicas", "only deployment workloads can run more than one replica");
        }
        let replicas = count(self.replicas, "replicas", errors);

        Some(ProviderTarget::Kubernetes(KubernetesTarget {
            credentials: credentials?,
            namespace,
            workload_kind,
            replicas,
        }))
    }

    fn ecs_target(&mut self, errors: &mut ValidationError) -> Option<ProviderTarget> {
        let credentials = match self.credentials.take() {
            None => {
                errors.push("credentials", REQUIRED);
                None
            }
            Some(payload) => {
                let access_key_id = non_blank_secret(payload.access_key_id);
                if access_key_id.is_none() {
                    errors.push("credentials.access_key_id", REQUIRED);
                }
                let secret_access_key = non_blank_secret(payload.secret_access_key);
                if secret_access_key.is_none() {
                    errors.push("credentials.secret_access_key", REQUIRED);
                }
                let region = required(payload.region, "credentials.region", errors);
                match (access_key_id, secret_access_key, region) {
                    (Some(access_key_id), Some(secret_access_key), Some(region)) => {
                        Some(AwsCredentials {
                            access_key_id,
                            secret_access_key,
                            session_token: non_blank_secret(payload.session_token),
                            region,
                        })
                    }
                    _ => None,
                }
            }
        };

        let cluster = required(self.cluster.take(), "cluster", errors);
        let launch_type: LaunchType =
            parse_or_default(self.launch_type.take(), "launch_type", errors);
        let desired_count = count(self.desired_count, "desired_count", errors);

        Some(ProviderTarget::Ecs(EcsTarget {
            credentials: credentials?,
            cluster: cluster?,
            launch_type,
            subnets: std::mem::take(&mut self.subnets)
                .into_iter()
                .filter_map(|s| non_blank(Some(s)))
                .collect(),
            security_groups: std::mem::take(&mut self.security_groups)
                .into_iter()
                .filter_map(|s| non_blank(Some(s)))
                .collect(),
            assign_public_ip: self.assign_public_ip.unwrap_or(false),
            cpu: non_blank(self.cpu.take()).unwrap_or_else(|| DEFAULT_ECS_CPU.to_string()),
            memory: non_blank(self.memory.take()).unwrap_or_else(|| DEFAULT_ECS_MEMORY.to_string()),
            desired_count,
            execution_role_arn: non_blank(self.execution_role_arn.take()),
        }))
    }
}
