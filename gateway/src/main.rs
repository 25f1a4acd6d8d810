use deploy_utils::{setup_logging, GatewayConfig};
use env_common::Dispatcher;
use gateway::{default_registry, run_server, GatewayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    setup_logging()?;

    let config = GatewayConfig::from_env()?;
    let registry = default_registry(&config);
    log::info!(
        "Serving providers {:?} with a {:?} deploy timeout",
        registry.providers(),
        config.deploy_timeout
    );

    let dispatcher = Dispatcher::new(registry, config.deploy_timeout);
    run_server(&config, GatewayState::new(dispatcher)).await
}
