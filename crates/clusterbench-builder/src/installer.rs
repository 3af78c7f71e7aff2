use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use tracing::{debug, info};
use walkdir::WalkDir;

use clusterbench_core::{
    Artifacts, CoreError, CoreResult, Executor, Host, Installer, Node, PluginConfigInstance, Variables,
};

use crate::downloader::DISTRIBUTION;
use crate::plugin_config::template_dirs;
use crate::template::TemplateRenderer;

const NODE_CONFIG_FILE: &str = "config/opensearch.yml";

const NODE_CONFIG_TEMPLATE: &str = r#"cluster.name: {{ cluster_name }}
node.name: {{ node_name }}
network.host: {{ node_ip }}
path.data: {{ data_path }}
path.logs: {{ log_path }}
discovery.seed_hosts: [{% for ip in seed_hosts %}"{{ ip }}"{% if not loop.last %}, {% endif %}{% endfor %}]
{%- if plugins %}
plugin.mandatory: [{% for name in plugins %}"{{ name }}"{% if not loop.last %}, {% endif %}{% endfor %}]
{%- endif %}
"#;

/// A file to place below the node's install root.
enum ConfigFile {
    Rendered(String),
    /// Copied as is.
    Binary(PathBuf),
}

/// Unpacks the distribution into a per-host directory and installs selected plugins.
///
/// Plugins are expected as returned by
/// [`resolve_plugin_config`](crate::plugin_config::resolve_plugin_config): their
/// `config_paths` are template directories mirroring the install root.
pub struct BareInstaller {
    executor: Arc<dyn Executor>,
    renderer: TemplateRenderer,
    cluster_name: String,
    install_root: PathBuf,
    plugins: Vec<PluginConfigInstance>,
    plugin_params: Variables,
}

impl BareInstaller {
    pub fn new(
        executor: Arc<dyn Executor>,
        cluster_name: impl Into<String>,
        install_root: impl Into<PathBuf>,
        plugins: Vec<PluginConfigInstance>,
    ) -> Self {
        Self {
            executor,
            renderer: TemplateRenderer::new(),
            cluster_name: cluster_name.into(),
            install_root: install_root.into(),
            plugins,
            plugin_params: Variables::new(),
        }
    }

    #[must_use]
    pub fn with_plugin_params(mut self, plugin_params: Variables) -> Self {
        self.plugin_params = plugin_params;
        self
    }

    fn node_root(&self, host: &Host) -> PathBuf {
        self.install_root.join(&host.name)
    }

    async fn run(&self, host: &Host, command: String) -> CoreResult<()> {
        self.executor.execute(host, &command, false).await.map(|_| ())
    }

    async fn install_plugins(&self, host: &Host, node_root: &Path) -> CoreResult<()> {
        let plugin_binary = node_root.join("bin").join("opensearch-plugin");
        let mut installed = Vec::new();

        for plugin in &self.plugins {
            if installed.contains(&plugin.name) {
                continue;
            }
            // user-supplied plugins may point at their own archive
            let source = plugin
                .variables
                .get("plugin_url")
                .cloned()
                .unwrap_or_else(|| plugin.name.clone());

            info!(host = %host.name, plugin = %plugin.name, core = plugin.is_core_plugin, "installing plugin");
            self.run(host, format!("{} install --batch {source}", plugin_binary.display()))
                .await
                .map_err(|err| {
                    CoreError::setup(plugin.name.clone(), format!("plugin installation failed: {err}"))
                })?;
            installed.push(plugin.name.clone());
        }
        Ok(())
    }

    /// Variables seen by config templates and bootstrap hooks.
    ///
    /// Plugin variables are merged in selection order, `plugin_params` override
    /// them and the install-time values override everything.
    fn node_variables(&self, host: &Host, node_root: &Path, node_name: &str) -> Variables {
        let mut variables = Variables::new();
        for plugin in &self.plugins {
            variables.extend(plugin.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        variables.extend(self.plugin_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables.insert("install_root_path".to_string(), node_root.display().to_string());
        variables.insert("node_name".to_string(), node_name.to_string());
        variables.insert("node_ip".to_string(), host.address.clone());
        variables
    }

    fn render_node_config(
        &self,
        host: &Host,
        node_root: &Path,
        node_name: &str,
        all_node_ips: &[String],
    ) -> CoreResult<String> {
        let mut plugin_names: Vec<&str> = self.plugins.iter().map(|p| p.name.as_str()).collect();
        plugin_names.dedup();

        self.renderer.render_str(
            NODE_CONFIG_TEMPLATE,
            context! {
                cluster_name => &self.cluster_name,
                node_name => node_name,
                node_ip => &host.address,
                data_path => node_root.join("data").display().to_string(),
                log_path => node_root.join("logs").display().to_string(),
                seed_hosts => all_node_ips,
                plugins => plugin_names,
            },
        )
    }

    /// Renders every plugin template tree on top of the node config.
    ///
    /// Text files are rendered with `variables`; a rendered file whose path is
    /// already taken is appended to it. Other files are copied unchanged.
    async fn collect_config_files(
        &self,
        node_config: String,
        variables: &Variables,
    ) -> CoreResult<BTreeMap<PathBuf, ConfigFile>> {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from(NODE_CONFIG_FILE), ConfigFile::Rendered(node_config));

        for (plugin, dir) in template_dirs(&self.plugins) {
            let entries = WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter(|entry| entry.as_ref().map_or(true, |entry| entry.file_type().is_file()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(std::io::Error::from)?;

            for entry in entries {
                let relative = entry.path().strip_prefix(dir).map_err(|_| {
                    CoreError::setup(plugin, format!("{} is outside its template directory", entry.path().display()))
                })?;
                let relative = relative.to_path_buf();

                let content = tokio::fs::read(entry.path()).await?;
                let Ok(template) = String::from_utf8(content) else {
                    files.insert(relative, ConfigFile::Binary(entry.path().to_path_buf()));
                    continue;
                };
                let rendered = self.renderer.render_str(&template, variables).map_err(|err| {
                    CoreError::setup(plugin, format!("cannot render {}: {err}", entry.path().display()))
                })?;

                match files.entry(relative) {
                    Entry::Occupied(mut existing) => match existing.get_mut() {
                        ConfigFile::Rendered(text) => {
                            if !text.is_empty() && !text.ends_with('\n') {
                                text.push('\n');
                            }
                            text.push_str(&rendered);
                        }
                        binary => *binary = ConfigFile::Rendered(rendered),
                    },
                    Entry::Vacant(slot) => {
                        slot.insert(ConfigFile::Rendered(rendered));
                    }
                }
            }
        }
        Ok(files)
    }

    async fn write_config_files(
        &self,
        host: &Host,
        node_root: &Path,
        files: BTreeMap<PathBuf, ConfigFile>,
    ) -> CoreResult<()> {
        let staging = tempfile::tempdir()?;

        for (i, (relative, file)) in files.into_iter().enumerate() {
            let destination = node_root.join(&relative);
            debug!(host = %host.name, destination = %destination.display(), "writing config file");
            match file {
                ConfigFile::Rendered(text) => {
                    let local = staging.path().join(i.to_string());
                    tokio::fs::write(&local, text).await?;
                    self.executor.copy(host, &local, &destination).await?;
                }
                ConfigFile::Binary(source) => self.executor.copy(host, &source, &destination).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Installer for BareInstaller {
    async fn install(
        &self,
        host: &Host,
        artifacts: &Artifacts,
        all_node_ips: &[String],
    ) -> CoreResult<Node> {
        let distribution = artifacts
            .get(DISTRIBUTION)
            .ok_or_else(|| CoreError::not_found("artifact", DISTRIBUTION))?;
        let node_root = self.node_root(host);
        let node_name = format!("benchmark-node-{}", host.name);

        info!(host = %host.name, root = %node_root.display(), "installing node");

        self.run(host, format!("mkdir -m 0777 -p {}", node_root.display())).await?;
        self.run(
            host,
            format!(
                "tar -xzf {} -C {} --strip-components=1",
                distribution.display(),
                node_root.display()
            ),
        )
        .await?;

        self.install_plugins(host, &node_root).await?;

        let variables = self.node_variables(host, &node_root, &node_name);
        let node_config = self.render_node_config(host, &node_root, &node_name, all_node_ips)?;
        let files = self.collect_config_files(node_config, &variables).await?;
        self.write_config_files(host, &node_root, files).await?;

        Ok(Node {
            name: node_name,
            host_name: host.name.clone(),
            binary_path: node_root.join("bin").join("opensearch"),
            install_root: node_root,
            pid: None,
            variables,
        })
    }

    async fn cleanup(&self, host: &Host) -> CoreResult<()> {
        let node_root = self.node_root(host);
        let path = node_root.display().to_string();
        if path.is_empty() || path == "/" || host.name.is_empty() {
            return Ok(());
        }

        info!(host = %host.name, root = %path, "removing node installation");
        self.run(host, format!("rm -rf {path}")).await
    }
}
