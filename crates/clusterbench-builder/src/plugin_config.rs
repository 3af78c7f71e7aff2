//! Resolution of a listed plugin configuration into its template directories
//! and variables.
//!
//! A sub-configuration file looks like:
//!
//! ```ini
//! [config]
//! base = default,tls
//!
//! [variables]
//! plugin_url = file:///opt/plugins/complex-plugin.zip
//! ```
//!
//! Every base names `<plugin dir>/<base>/templates`, a tree rendered into the
//! node's install root.

use std::path::{Path, PathBuf};

use config::{Config, FileFormat};
use tracing::debug;

use clusterbench_core::{CoreError, CoreResult, PluginConfigInstance, Variables};

const TEMPLATES_DIR: &str = "templates";

/// Reads the sub-configuration files of a listed plugin.
///
/// The returned instance has `config_paths` pointing at template directories
/// and `variables` holding the files' `[variables]` sections, overridden by
/// `plugin_params`. Built-in plugins only take `plugin_params`.
pub fn resolve_plugin_config(
    plugin: &PluginConfigInstance,
    plugin_params: &Variables,
) -> CoreResult<PluginConfigInstance> {
    let mut resolved = plugin.clone();
    resolved.config_paths = Vec::new();
    resolved.variables = Variables::new();

    if !plugin.is_core_plugin {
        let root = plugin.root_path.as_deref().ok_or_else(|| {
            CoreError::setup(plugin.name.clone(), "plugin configuration has no root path")
        })?;

        for config_file in &plugin.config_paths {
            let (bases, variables) = read_config_file(&plugin.name, config_file)?;
            for base in bases {
                let templates = root.join(&base).join(TEMPLATES_DIR);
                if !resolved.config_paths.contains(&templates) {
                    resolved.config_paths.push(templates);
                }
            }
            resolved.variables.extend(variables);
        }

        if resolved.config_paths.is_empty() {
            return Err(CoreError::setup(
                plugin.name.clone(),
                format!("At least one config base is required for plugin [{}]", plugin.name),
            ));
        }
    }

    resolved
        .variables
        .extend(plugin_params.iter().map(|(k, v)| (k.clone(), v.clone())));

    debug!(
        plugin = %plugin.name,
        templates = resolved.config_paths.len(),
        variables = resolved.variables.len(),
        "resolved plugin configuration"
    );
    Ok(resolved)
}

fn read_config_file(plugin: &str, path: &Path) -> CoreResult<(Vec<String>, Variables)> {
    let invalid = |err: config::ConfigError| {
        CoreError::setup(plugin, format!("invalid plugin configuration {}: {err}", path.display()))
    };

    let settings = Config::builder()
        .add_source(config::File::from(path).format(FileFormat::Ini))
        .build()
        .map_err(invalid)?;

    let bases = settings
        .get_string("config.base")
        .map(|bases| {
            bases
                .split(',')
                .map(str::trim)
                .filter(|base| !base.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut variables = Variables::new();
    if let Ok(table) = settings.get_table("variables") {
        for (key, value) in table {
            variables.insert(key, value.into_string().map_err(invalid)?);
        }
    }

    Ok((bases, variables))
}

/// Template directories of `plugins` in selection order, without repeats.
pub fn template_dirs(plugins: &[PluginConfigInstance]) -> Vec<(&str, &PathBuf)> {
    let mut dirs: Vec<(&str, &PathBuf)> = Vec::new();
    for plugin in plugins {
        for path in &plugin.config_paths {
            if !dirs.iter().any(|(_, seen)| *seen == path) {
                dirs.push((plugin.name.as_str(), path));
            }
        }
    }
    dirs
}
