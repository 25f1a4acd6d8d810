mod adapter;
mod connector;
mod manifest;

pub use adapter::KubernetesAdapter;
pub use connector::{map_kube_error, ClusterConnector, KubeConnector};
pub use manifest::{build_workload, Workload, MANAGED_BY};
