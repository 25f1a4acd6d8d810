use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use deploy_utils::GatewayConfig;
use env_aws::{AwsEcsApi, EcsAdapter};
use env_common::AdapterRegistry;
use env_kubernetes::{KubeConnector, KubernetesAdapter};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::handlers::{deploy_handler, openapi_handler, root_handler};
use crate::GatewayState;

pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/deploy", post(deploy_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The adapters the binary serves: Kubernetes through `kube`, ECS through
/// the AWS SDK.
pub fn default_registry(config: &GatewayConfig) -> AdapterRegistry {
    let mut connector = KubeConnector::new(config.default_kubeconfig.clone());
    if let Some(dir) = &config.kubeconfig_dir {
        connector = connector.with_kubeconfig_dir(dir);
    }

    AdapterRegistry::new()
        .with(Arc::new(KubernetesAdapter::new(connector)))
        .with(Arc::new(EcsAdapter::new(AwsEcsApi::new())))
}

pub async fn run_server(config: &GatewayConfig, state: GatewayState) -> Result<()> {
    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {}", addr))?;

    run_server_with_listener(listener, state, shutdown_signal()).await
}

pub async fn run_server_with_listener<F>(
    listener: TcpListener,
    state: GatewayState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    log::info!("Deployment gateway listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Deployment gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutting down gracefully");
}
