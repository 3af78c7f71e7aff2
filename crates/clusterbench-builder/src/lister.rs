//! Discovery of plugin configurations in the cluster config tree.
//!
//! Layout of one format version:
//!
//! ```text
//! plugins/v1/
//!   core-plugins.txt        built-in plugins, one per line, `#` comments
//!   complex_plugin/
//!     config-a.ini          -> complex-plugin [config-a]
//!     config-b.ini          -> complex-plugin [config-b]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use clusterbench_core::{ConfigInstanceType, CoreError, CoreResult, PluginConfigInstance};

use crate::config_path::ConfigPathResolver;

const CORE_PLUGINS_MANIFEST: &str = "core-plugins.txt";
const CONFIG_FILE_EXTENSION: &str = "ini";

/// Lists built-in and user-supplied plugin configurations.
#[derive(Debug, Clone)]
pub struct PluginConfigInstanceLister {
    resolver: ConfigPathResolver,
}

impl PluginConfigInstanceLister {
    pub fn new(resolver: ConfigPathResolver) -> Self {
        Self { resolver }
    }

    /// Lists every plugin configuration of every supported format version,
    /// sorted by `(format_version, name, first config name)`.
    pub fn list_plugin_config_instances(&self) -> CoreResult<Vec<PluginConfigInstance>> {
        let plugin_type = ConfigInstanceType::Plugin;
        let mut instances = Vec::new();

        for &version in plugin_type.supported_format_versions() {
            let root = self.resolver.resolve_config_path(plugin_type, version)?;
            let format_version = format!("v{version}");

            instances.extend(list_core_plugins(&root, &format_version)?);
            instances.extend(list_configured_plugins(&root, &format_version)?);
        }

        instances.sort_by(|a, b| {
            (&a.format_version, &a.name, a.first_config_name())
                .cmp(&(&b.format_version, &b.name, b.first_config_name()))
        });

        debug!(count = instances.len(), "listed plugin config instances");
        Ok(instances)
    }
}

fn list_core_plugins(root: &Path, format_version: &str) -> CoreResult<Vec<PluginConfigInstance>> {
    let manifest = root.join(CORE_PLUGINS_MANIFEST);
    if !manifest.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&manifest)?;
    Ok(parse_core_plugins(&content, format_version))
}

/// Parses the built-in plugin manifest. Only the text before the first `,` names the plugin.
fn parse_core_plugins(content: &str, format_version: &str) -> Vec<PluginConfigInstance> {
    content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.trim().split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| PluginConfigInstance::core(name, format_version))
        .collect()
}

fn list_configured_plugins(root: &Path, format_version: &str) -> CoreResult<Vec<PluginConfigInstance>> {
    let mut plugins = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let plugin_path = entry.path();
        if !plugin_path.is_dir() {
            continue;
        }

        let directory_name = entry.file_name().to_string_lossy().into_owned();
        let plugin_name = directory_name.replace('_', "-");

        for config_file in config_files(&plugin_path)? {
            let Some(config_name) = config_file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            plugins.push(
                PluginConfigInstance::configured(plugin_name.clone(), format_version, config_name)
                    .with_root_path(plugin_path.clone())
                    .with_config_paths(vec![config_file]),
            );
        }
    }

    Ok(plugins)
}

/// Config files directly inside a plugin directory; subdirectories are not searched.
fn config_files(plugin_path: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(plugin_path)? {
        let path = entry?.path();
        let is_config = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == CONFIG_FILE_EXTENSION);
        if is_config {
            files.push(path);
        }
    }
    Ok(files)
}

/// Picks the instances named in `selection`.
///
/// An entry is either a plugin name, which selects every configuration of that
/// plugin, or `name:config` to select one sub-configuration.
pub fn select_plugins(
    available: &[PluginConfigInstance],
    selection: &[String],
) -> CoreResult<Vec<PluginConfigInstance>> {
    let mut selected: Vec<PluginConfigInstance> = Vec::new();

    for entry in selection {
        let (name, config) = match entry.split_once(':') {
            Some((name, config)) => (name, Some(config)),
            None => (entry.as_str(), None),
        };

        let matches: Vec<_> = available
            .iter()
            .filter(|instance| instance.name == name)
            .filter(|instance| config.is_none() || instance.first_config_name() == config)
            .cloned()
            .collect();

        if matches.is_empty() {
            return Err(CoreError::not_found("plugin", entry.clone()));
        }

        for instance in matches {
            if !selected.contains(&instance) {
                selected.push(instance);
            }
        }
    }

    Ok(selected)
}
