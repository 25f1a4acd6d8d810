mod config;
mod logging;
mod naming;

pub use config::{GatewayConfig, DEFAULT_DEPLOY_TIMEOUT_SECS, DEFAULT_PORT};
pub use logging::{level_from_env, setup_logging};
pub use naming::{is_ecs_cluster_reference, is_ecs_resource_name, is_rfc1123_label};
