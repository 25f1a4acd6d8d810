use regex::Regex;
use std::sync::LazyLock;

static RFC1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

static ECS_RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").unwrap());

static ECS_CLUSTER_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-zA-Z-]*:ecs:[a-z0-9-]+:[0-9]{12}:cluster/[A-Za-z0-9_-]{1,255}$")
        .unwrap()
});

/// Kubernetes object names and namespaces: lowercase alphanumerics and '-',
/// starting and ending with an alphanumeric, at most 63 characters.
pub fn is_rfc1123_label(name: &str) -> bool {
    name.len() <= 63 && RFC1123_LABEL.is_match(name)
}

/// ECS service names and task definition families.
pub fn is_ecs_resource_name(name: &str) -> bool {
    ECS_RESOURCE_NAME.is_match(name)
}

/// A cluster may be given by name or by full ARN.
pub fn is_ecs_cluster_reference(cluster: &str) -> bool {
    is_ecs_resource_name(cluster) || ECS_CLUSTER_ARN.is_match(cluster)
}
