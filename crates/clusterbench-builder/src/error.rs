use std::fmt;

use thiserror::Error;

use clusterbench_core::{Cluster, CoreError};

/// Stage of `create_cluster` that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Provision,
    Download,
    Install,
    Bootstrap,
    Launch,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Provision => "provision",
            Self::Download => "download",
            Self::Install => "install",
            Self::Bootstrap => "bootstrap",
            Self::Launch => "launch",
        };
        f.write_str(name)
    }
}

/// Cluster creation failed.
///
/// Carries whatever was acquired before the failure so the caller can retry
/// `delete_cluster` if the automatic teardown did not release everything.
#[derive(Debug, Error)]
#[error("cluster creation failed during {stage}: {source}")]
pub struct ClusterCreationError {
    pub stage: LifecycleStage,
    pub cluster: Option<Box<Cluster>>,
    #[source]
    pub source: CoreError,
}

impl ClusterCreationError {
    pub fn new(stage: LifecycleStage, cluster: Option<Cluster>, source: CoreError) -> Self {
        Self {
            stage,
            cluster: cluster.map(Box::new),
            source,
        }
    }
}
