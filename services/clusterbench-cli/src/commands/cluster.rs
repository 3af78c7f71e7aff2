use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use clusterbench_builder::{ClusterBuilder, LocalShellExecutor};
use clusterbench_core::{Cluster, ClusterBenchConfig};

fn builder(config: &ClusterBenchConfig, name: &str) -> Result<ClusterBuilder> {
    ClusterBuilder::from_config(name, config, Arc::new(LocalShellExecutor::new()))
        .context("failed to set up the cluster builder")
}

pub async fn create(config: &ClusterBenchConfig, name: &str, state: &Path) -> Result<()> {
    let builder = builder(config, name)?;

    match builder.create_cluster().await {
        Ok(cluster) => {
            write_state(state, &cluster)?;
            println!("Cluster [{}] launched on {} host(s)", cluster.name, cluster.hosts.len());
            println!("State written to {}", state.display());
            Ok(())
        }
        Err(err) => {
            // keep whatever could not be released so `cluster delete` can retry
            if let Some(cluster) = &err.cluster {
                write_state(state, cluster)?;
            }
            Err(err.into())
        }
    }
}

pub async fn delete(config: &ClusterBenchConfig, state: &Path) -> Result<()> {
    let content = std::fs::read_to_string(state)
        .with_context(|| format!("failed to read cluster state {}", state.display()))?;
    let mut cluster: Cluster = serde_json::from_str(&content).context("invalid cluster state")?;

    let builder = builder(config, &cluster.name)?;
    builder.delete_cluster(&mut cluster).await?;

    std::fs::remove_file(state)?;
    info!(id = %cluster.id, "removed cluster state");
    println!("Cluster [{}] deleted", cluster.name);
    Ok(())
}

fn write_state(path: &Path, cluster: &Cluster) -> Result<()> {
    let content = serde_json::to_string_pretty(cluster)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
