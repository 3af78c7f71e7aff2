use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cluster::{Host, Node};
use crate::error::CoreResult;

/// Downloaded artifacts on a host, keyed by component (e.g. `"distribution"`).
pub type Artifacts = BTreeMap<String, PathBuf>;

/// Runs commands on cluster hosts.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs `command` on `host`.
    ///
    /// When `output` is set the trimmed stdout lines are returned, otherwise
    /// the result is empty. A non-zero exit is an error carrying the exit code.
    async fn execute(&self, host: &Host, command: &str, output: bool) -> CoreResult<Vec<String>>;

    /// Copies a local file onto the host.
    async fn copy(&self, host: &Host, source: &Path, destination: &Path) -> CoreResult<()>;
}

/// Acquires and releases the machines backing a cluster.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(&self) -> CoreResult<Vec<Host>>;

    /// Releases a single host. Must tolerate hosts that are already released.
    async fn tear_down(&self, host: &Host) -> CoreResult<()>;
}

/// Fetches the distribution onto a host.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, host: &Host) -> CoreResult<Artifacts>;
}

/// Prepares a node on a host from downloaded artifacts.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Installs the node. `all_node_ips` lists every node address for cluster formation.
    async fn install(
        &self,
        host: &Host,
        artifacts: &Artifacts,
        all_node_ips: &[String],
    ) -> CoreResult<Node>;

    /// Removes everything `install` created on the host.
    async fn cleanup(&self, host: &Host) -> CoreResult<()>;
}

/// Starts and stops node processes.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Starts the node and returns it with its process id set.
    async fn start(&self, host: &Host, node: &Node) -> CoreResult<Node>;

    async fn stop(&self, host: &Host, node: &Node) -> CoreResult<()>;
}
