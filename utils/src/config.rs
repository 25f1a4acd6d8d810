use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Process settings, read once at startup from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Used for Kubernetes requests that carry no credentials of their own.
    pub default_kubeconfig: Option<PathBuf>,
    /// Directory request supplied kubeconfig paths must resolve into. Unset
    /// means requests may not name kubeconfig files at all.
    pub kubeconfig_dir: Option<PathBuf>,
    pub deploy_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_address = value("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
            .parse::<IpAddr>()
            .context("BIND_ADDRESS must be an IP address")?;

        let port = match value("PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("PORT must be a number between 0 and 65535, got '{}'", port))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match value("DEPLOY_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("DEPLOY_TIMEOUT_SECS must be a number, got '{}'", secs))?,
            None => DEFAULT_DEPLOY_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(anyhow!("DEPLOY_TIMEOUT_SECS must be greater than zero"));
        }

        Ok(GatewayConfig {
            bind_address,
            port,
            default_kubeconfig: value("DEFAULT_KUBECONFIG").map(PathBuf::from),
            kubeconfig_dir: value("KUBECONFIG_DIR").map(PathBuf::from),
            deploy_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
