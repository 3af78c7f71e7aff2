use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Family of installable component configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigInstanceType {
    Plugin,
}

impl ConfigInstanceType {
    /// Every known configuration family.
    pub const ALL: [ConfigInstanceType; 1] = [ConfigInstanceType::Plugin];

    /// Subdirectory of the config tree holding this family.
    pub fn config_type(self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
        }
    }

    /// Config format versions that can be listed.
    pub fn supported_format_versions(self) -> &'static [u32] {
        match self {
            Self::Plugin => &[1],
        }
    }

    /// Format version used when the caller does not name one.
    pub fn default_format_version(self) -> u32 {
        match self {
            Self::Plugin => 1,
        }
    }
}

/// A discovered, installable plugin configuration.
///
/// Identity is `(name, config_names, is_core_plugin)`. Two instances of the same
/// plugin with different sub-configurations are distinct, while `root_path`,
/// `config_paths` and `variables` never take part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfigInstance {
    pub name: String,
    /// Format version label, e.g. `v1`.
    pub format_version: String,
    pub is_core_plugin: bool,
    pub config_names: Option<Vec<String>>,
    /// Directory from which bootstrap hooks are resolved.
    pub root_path: Option<PathBuf>,
    pub config_paths: Vec<PathBuf>,
    pub variables: BTreeMap<String, String>,
}

impl PluginConfigInstance {
    const ENTRY_POINT: &'static str = "plugin";

    /// Built-in plugin shipped with the distribution.
    pub fn core(name: impl Into<String>, format_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format_version: format_version.into(),
            is_core_plugin: true,
            config_names: None,
            root_path: None,
            config_paths: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    /// User-supplied plugin with a single named configuration.
    pub fn configured(
        name: impl Into<String>,
        format_version: impl Into<String>,
        config_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            format_version: format_version.into(),
            is_core_plugin: false,
            config_names: Some(vec![config_name.into()]),
            root_path: None,
            config_paths: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }

    pub fn with_config_paths(mut self, config_paths: Vec<PathBuf>) -> Self {
        self.config_paths = config_paths;
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Name of the file that carries a plugin's bootstrap hooks.
    pub fn entry_point() -> &'static str {
        Self::ENTRY_POINT
    }

    /// First sub-configuration name, used as the last sort key when listing.
    pub fn first_config_name(&self) -> Option<&str> {
        self.config_names
            .as_ref()
            .and_then(|names| names.first())
            .map(String::as_str)
    }
}

impl PartialEq for PluginConfigInstance {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.config_names == other.config_names
            && self.is_core_plugin == other.is_core_plugin
    }
}

impl Eq for PluginConfigInstance {}

impl Hash for PluginConfigInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.config_names.hash(state);
        self.is_core_plugin.hash(state);
    }
}

impl fmt::Display for PluginConfigInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin descriptor for [{}]", self.name)
    }
}
