//! Cluster lifecycle: provision, download, install, bootstrap, launch and teardown.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use clusterbench_core::{
    Artifacts, BootstrapPhase, ClusterBenchConfig, Cluster, ClusterState, CoreError, CoreResult,
    Downloader, Executor, Host, Installer, Launcher, Node, PluginConfigInstance, Provisioner,
};

use crate::bootstrap::BootstrapHookRegistry;
use crate::config_path::ConfigPathResolver;
use crate::downloader::DistributionDownloader;
use crate::error::{ClusterCreationError, LifecycleStage};
use crate::installer::BareInstaller;
use crate::launcher::ProcessLauncher;
use crate::lister::{select_plugins, PluginConfigInstanceLister};
use crate::plugin_config::resolve_plugin_config;
use crate::provisioner::provisioner_for;

type StageResult<T> = Result<T, (LifecycleStage, CoreError)>;

/// Drives a cluster through its lifecycle using injected collaborators.
pub struct ClusterBuilder {
    name: String,
    provisioner: Arc<dyn Provisioner>,
    downloader: Arc<dyn Downloader>,
    installer: Arc<dyn Installer>,
    launcher: Arc<dyn Launcher>,
    executor: Arc<dyn Executor>,
    hooks: Arc<BootstrapHookRegistry>,
    active: Vec<String>,
    parallel: bool,
}

impl ClusterBuilder {
    pub fn new(
        name: impl Into<String>,
        provisioner: Arc<dyn Provisioner>,
        downloader: Arc<dyn Downloader>,
        installer: Arc<dyn Installer>,
        launcher: Arc<dyn Launcher>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            name: name.into(),
            provisioner,
            downloader,
            installer,
            launcher,
            executor,
            hooks: Arc::new(BootstrapHookRegistry::new()),
            active: Vec::new(),
            parallel: true,
        }
    }

    /// Sets the hooks to run after install and the component names they see as active.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<BootstrapHookRegistry>, active: Vec<String>) -> Self {
        self.hooks = hooks;
        self.active = active;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Wires the concrete collaborators described by `config`.
    pub fn from_config(
        name: impl Into<String>,
        config: &ClusterBenchConfig,
        executor: Arc<dyn Executor>,
    ) -> CoreResult<Self> {
        let name = name.into();
        let builder = &config.builder;

        let selected = if builder.plugins.is_empty() {
            Vec::new()
        } else {
            let lister =
                PluginConfigInstanceLister::new(ConfigPathResolver::new(&builder.cluster_config_path));
            select_plugins(&lister.list_plugin_config_instances()?, &builder.plugins)?
                .into_iter()
                .map(|plugin| resolve_plugin_config(&plugin, &builder.plugin_params))
                .collect::<CoreResult<Vec<_>>>()?
        };

        let version = builder.distribution_version.clone().ok_or_else(|| {
            CoreError::ValidationError(
                "builder.distribution_version must be set to create a cluster".to_string(),
            )
        })?;

        let hooks = BootstrapHookRegistry::for_plugins(&selected)?;
        let active = active_names(&selected);

        let downloader = DistributionDownloader::new(
            executor.clone(),
            builder.distribution_url.clone(),
            version,
            builder.install_root.clone(),
        )
        .with_cache(builder.distribution_cache);
        let installer = BareInstaller::new(
            executor.clone(),
            name.clone(),
            builder.install_root.clone(),
            selected,
        )
        .with_plugin_params(builder.plugin_params.clone());

        Ok(Self::new(
            name,
            provisioner_for(&config.provisioner),
            Arc::new(downloader),
            Arc::new(installer),
            Arc::new(ProcessLauncher::new(executor.clone())),
            executor,
        )
        .with_hooks(Arc::new(hooks), active)
        .with_parallel(builder.parallel_hosts))
    }

    /// Provisions, installs, bootstraps and launches a cluster.
    ///
    /// Nothing is launched unless install and bootstrap succeeded on every host.
    /// On failure the acquired resources are torn down before returning.
    #[instrument(skip(self), fields(cluster = %self.name))]
    pub async fn create_cluster(&self) -> Result<Cluster, ClusterCreationError> {
        let hosts = self
            .provisioner
            .provision()
            .await
            .map_err(|err| ClusterCreationError::new(LifecycleStage::Provision, None, err))?;
        let mut cluster = Cluster::new(self.name.clone(), hosts);
        info!(id = %cluster.id, hosts = cluster.hosts.len(), "provisioned cluster");

        let hosts = cluster.hosts.clone();
        let all_node_ips = cluster.node_addresses();

        let installed = self
            .for_each_host(&hosts, |host| self.prepare_host(host, &all_node_ips))
            .await;

        let mut failure = None;
        for result in installed {
            match result {
                Ok(node) => {
                    cluster.nodes.insert(node.host_name.clone(), node);
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let Some((stage, err)) = failure {
            return Err(self.abort(cluster, stage, err).await);
        }
        cluster.state = ClusterState::Installed;

        let nodes: Vec<(Host, Node)> = hosts
            .iter()
            .filter_map(|host| cluster.node(host).map(|node| (host.clone(), node.clone())))
            .collect();
        let launched = self
            .for_each_host(&nodes, |(host, node)| self.launcher.start(host, node))
            .await;

        let mut failure = None;
        for result in launched {
            match result {
                Ok(node) => {
                    cluster.nodes.insert(node.host_name.clone(), node);
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = failure {
            return Err(self.abort(cluster, LifecycleStage::Launch, err).await);
        }

        cluster.state = ClusterState::Launched;
        info!(id = %cluster.id, nodes = cluster.nodes.len(), "cluster launched");
        Ok(cluster)
    }

    /// Stops running nodes, removes installations and releases every host.
    ///
    /// A failure on one host never prevents the remaining hosts from being
    /// processed. All failures are reported together.
    #[instrument(skip_all, fields(cluster = %cluster.name))]
    pub async fn delete_cluster(&self, cluster: &mut Cluster) -> CoreResult<()> {
        let mut failures = Vec::new();
        let hosts = cluster.hosts.clone();

        let running: Vec<(Host, Node)> = hosts
            .iter()
            .filter_map(|host| {
                cluster
                    .node(host)
                    .filter(|node| node.is_running())
                    .map(|node| (host.clone(), node.clone()))
            })
            .collect();
        let stopped = self
            .for_each_host(&running, |(host, node)| self.launcher.stop(host, node))
            .await;
        for ((host, _), result) in running.iter().zip(stopped) {
            match result {
                Ok(()) => {
                    if let Some(node) = cluster.nodes.get_mut(&host.name) {
                        node.pid = None;
                    }
                }
                Err(err) => failures.push(format!("stop on host [{}]: {err}", host.name)),
            }
        }

        let cleaned = self
            .for_each_host(&hosts, |host| self.installer.cleanup(host))
            .await;
        collect_failures(&mut failures, "cleanup", &hosts, cleaned);

        let released = self
            .for_each_host(&hosts, |host| self.provisioner.tear_down(host))
            .await;
        collect_failures(&mut failures, "tear down", &hosts, released);

        cluster.state = ClusterState::TornDown;

        if failures.is_empty() {
            info!(id = %cluster.id, "cluster deleted");
            Ok(())
        } else {
            warn!(id = %cluster.id, failures = failures.len(), "cluster deleted with failures");
            Err(CoreError::Teardown { failures })
        }
    }

    /// Download, install and bootstrap on a single host, in that order.
    async fn prepare_host(&self, host: &Host, all_node_ips: &[String]) -> StageResult<Node> {
        let artifacts: Artifacts = self
            .downloader
            .download(host)
            .await
            .map_err(|err| (LifecycleStage::Download, err))?;

        let node = self
            .installer
            .install(host, &artifacts, all_node_ips)
            .await
            .map_err(|err| (LifecycleStage::Install, err))?;

        self.hooks
            .run(
                BootstrapPhase::PostInstall,
                &self.active,
                &node.variables,
                host,
                self.executor.as_ref(),
            )
            .await
            .map_err(|err| (LifecycleStage::Bootstrap, err))?;

        Ok(node)
    }

    async fn abort(
        &self,
        mut cluster: Cluster,
        stage: LifecycleStage,
        err: CoreError,
    ) -> ClusterCreationError {
        error!(id = %cluster.id, %stage, %err, "cluster creation failed, tearing down");

        if let Err(teardown) = self.delete_cluster(&mut cluster).await {
            warn!(id = %cluster.id, %teardown, "teardown after failed creation was incomplete");
        }
        ClusterCreationError::new(stage, Some(cluster), err)
    }

    async fn for_each_host<'a, I, T, F, Fut>(&self, items: &'a [I], f: F) -> Vec<T>
    where
        F: Fn(&'a I) -> Fut,
        Fut: Future<Output = T>,
    {
        if self.parallel {
            join_all(items.iter().map(f)).await
        } else {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(f(item).await);
            }
            results
        }
    }
}

fn collect_failures(
    failures: &mut Vec<String>,
    action: &str,
    hosts: &[Host],
    results: Vec<CoreResult<()>>,
) {
    for (host, result) in hosts.iter().zip(results) {
        if let Err(err) = result {
            failures.push(format!("{action} on host [{}]: {err}", host.name));
        }
    }
}

/// Plugin and sub-configuration names hooks treat as active.
pub fn active_names(plugins: &[PluginConfigInstance]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for plugin in plugins {
        let config_names = plugin.config_names.iter().flatten();
        for name in std::iter::once(&plugin.name).chain(config_names) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}
