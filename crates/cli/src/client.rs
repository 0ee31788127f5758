//! Kubernetes client construction

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

/// Connect to the cluster, using an explicit kubeconfig when one is given
pub async fn connect(kubeconfig: Option<&str>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            debug!(path = %path, "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Invalid kubeconfig")?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    Client::try_from(config).context("Failed to create Kubernetes client")
}
