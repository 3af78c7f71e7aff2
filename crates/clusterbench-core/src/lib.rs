//! Core domain types and capability traits for ClusterBench cluster lifecycle management.

pub mod architecture;
pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod config_instance;
pub mod error;
pub mod traits;

pub use architecture::ArchitectureType;
pub use bootstrap::BootstrapPhase;
pub use cluster::{Cluster, ClusterState, Host, Node, Variables};
pub use config::{
    BuilderConfig, ClusterBenchConfig, LoadConfig, ProvisionerConfig, ProvisionerKind, WireEncoding,
};
pub use config_instance::{ConfigInstanceType, PluginConfigInstance};
pub use error::{CoreError, CoreResult};
pub use traits::{Artifacts, Downloader, Executor, Installer, Launcher, Provisioner};
