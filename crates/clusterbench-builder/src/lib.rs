//! Cluster builder for ClusterBench.
//!
//! Discovers installable plugin configurations, resolves per-host artifacts and
//! drives a search cluster through provision, install, bootstrap, launch and
//! teardown.

pub mod artifact_variables;
pub mod bootstrap;
pub mod config_path;
pub mod downloader;
pub mod error;
pub mod executor;
pub mod installer;
pub mod launcher;
pub mod lister;
pub mod mock;
pub mod orchestrator;
pub mod plugin_config;
pub mod provisioner;
pub mod template;

pub use artifact_variables::{ArtifactVariables, ArtifactVariablesProvider};
pub use bootstrap::{BootstrapHook, BootstrapHookRegistry, HookContext};
pub use config_path::ConfigPathResolver;
pub use downloader::{DistributionDownloader, DISTRIBUTION};
pub use error::{ClusterCreationError, LifecycleStage};
pub use executor::LocalShellExecutor;
pub use installer::BareInstaller;
pub use launcher::ProcessLauncher;
pub use lister::{select_plugins, PluginConfigInstanceLister};
pub use mock::MockExecutor;
pub use orchestrator::{active_names, ClusterBuilder};
pub use plugin_config::resolve_plugin_config;
pub use provisioner::{provisioner_for, StaticProvisioner};
pub use template::TemplateRenderer;
