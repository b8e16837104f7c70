// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of metrics-agent

pub mod runtime;

use crate::runtime::shutdown_token;
use color_eyre::eyre::{Context, Result};
use kube::Client;
use metrics_agent_common::kubernetes::KubeAgentConfig;
use std::path::Path;
use tracing::{info, warn};

const SCRATCH_MARKER_FILE: &str = ".metrics-agent-write-check";

/// Entry point of the collection engine. Takes ownership of the validated configuration and runs
/// until the process is asked to shut down.
pub async fn collect_kube_metrics(config: KubeAgentConfig) -> Result<()> {
    info! {
        cluster_name = config.cluster_name,
        namespace = config.namespace,
        poll_interval = ?config.poll_interval_duration(),
        informer_resync = ?config.informer_resync_duration(),
        concurrent_pollers = config.concurrent_pollers,
        "starting kubernetes metrics collection"
    }

    ensure_scratch_dir(&config.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "scratch directory {} is not writable",
                config.scratch_dir.display()
            )
        })?;

    let client = create_client(&config).await?;
    let version = client
        .apiserver_version()
        .await
        .context("unable to reach the kubernetes api server")?;
    info! {
        version = version.git_version,
        "connected to the kubernetes api server"
    }

    let token = shutdown_token().context("unable to install shutdown signal handlers")?;
    token.cancelled().await;

    info!(cluster_name = config.cluster_name, "shutting down");
    Ok(())
}

async fn create_client(config: &KubeAgentConfig) -> Result<Client> {
    // Uses the default kubeconfig file or the in-cluster configuration.
    let mut kube_config = kube::Config::infer()
        .await
        .context("unable to infer the kubernetes client configuration")?;
    if config.insecure {
        warn!("tls certificate verification is disabled");
        kube_config.accept_invalid_certs = true;
    }

    Client::try_from(kube_config).context("unable to construct a kubernetes client")
}

/// Checks that metrics can be written to `dir`.
pub async fn ensure_scratch_dir(dir: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(dir)
        .await
        .context("unable to read the directory metadata")?;
    if !metadata.is_dir() {
        color_eyre::eyre::bail!("{} is not a directory", dir.display());
    }

    let marker = dir.join(SCRATCH_MARKER_FILE);
    tokio::fs::write(&marker, b"")
        .await
        .context("unable to create a file")?;
    tokio::fs::remove_file(&marker)
        .await
        .context("unable to remove a file")?;
    Ok(())
}
