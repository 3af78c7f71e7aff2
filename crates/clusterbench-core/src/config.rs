//! Configuration management for ClusterBench
//!
//! Values are layered from:
//! - Hardcoded defaults
//! - YAML/TOML configuration files
//! - Environment variable overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::Host;

/// Root configuration structure for ClusterBench
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClusterBenchConfig {
    #[serde(default)]
    pub builder: BuilderConfig,

    #[serde(default)]
    pub provisioner: ProvisionerConfig,

    #[serde(default)]
    pub load: LoadConfig,
}

impl ClusterBenchConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by CLUSTERBENCH_CONFIG env var
    /// 3. ./config/clusterbench.yaml
    /// 4. /etc/clusterbench/clusterbench.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("CLUSTERBENCH_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/clusterbench").required(false))
            .add_source(File::with_name("/etc/clusterbench/clusterbench").required(false));

        builder = builder.add_source(Self::environment());

        let config: ClusterBenchConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        debug!(
            hosts = config.provisioner.hosts.len(),
            plugins = config.builder.plugins.len(),
            encoding = ?config.load.encoding,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Environment overrides. The prefix takes the `__` separator as well, e.g.
    /// `CLUSTERBENCH__BUILDER__DISTRIBUTION_VERSION=2.11.0`.
    fn environment() -> Environment {
        Environment::with_prefix("CLUSTERBENCH")
            .separator("__")
            .try_parsing(true)
    }

    /// Set default values for all configuration options
    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("builder.cluster_config_path", "./cluster_configs")?
            .set_default("builder.install_root", "/tmp/clusterbench/install")?
            .set_default("builder.distribution_url", DEFAULT_DISTRIBUTION_URL)?
            .set_default("builder.distribution_cache", true)?
            .set_default("builder.parallel_hosts", true)?
            .set_default("provisioner.kind", "static")?
            .set_default("load.encoding", "json")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.builder.distribution_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "builder.distribution_url must not be empty".to_string(),
            ));
        }

        if self.builder.install_root.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "builder.install_root must not be empty".to_string(),
            ));
        }

        for (i, host) in self.provisioner.hosts.iter().enumerate() {
            if host.name.trim().is_empty() || host.address.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "provisioner.hosts[{i}] needs both a name and an address"
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ClusterBenchConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

const DEFAULT_DISTRIBUTION_URL: &str = "https://artifacts.opensearch.org/releases/bundle/opensearch/{{VERSION}}/opensearch-{{VERSION}}-{{OSNAME}}-{{ARCH}}.tar.gz";

/// Cluster builder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Root of the `<config-type>/v<version>/` tree
    pub cluster_config_path: PathBuf,

    /// Directory on each host into which the node is installed
    pub install_root: PathBuf,

    /// Distribution version substituted as `VERSION`
    pub distribution_version: Option<String>,

    /// Download URL template (`VERSION`, `OSNAME`, `ARCH`)
    pub distribution_url: String,

    /// Reuse an already downloaded distribution
    pub distribution_cache: bool,

    /// Plugin names selected for installation
    pub plugins: Vec<String>,

    /// Free-form variables handed to bootstrap hooks
    pub plugin_params: BTreeMap<String, String>,

    /// Run per-host stages concurrently
    pub parallel_hosts: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            cluster_config_path: PathBuf::from("./cluster_configs"),
            install_root: PathBuf::from("/tmp/clusterbench/install"),
            distribution_version: None,
            distribution_url: DEFAULT_DISTRIBUTION_URL.to_string(),
            distribution_cache: true,
            plugins: Vec::new(),
            plugin_params: BTreeMap::new(),
            parallel_hosts: true,
        }
    }
}

/// How hosts are acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerKind {
    /// Hosts are listed in configuration and already exist
    #[default]
    Static,
}

/// Provisioner configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub kind: ProvisionerKind,

    /// Hosts used by the static provisioner
    pub hosts: Vec<Host>,
}

/// Wire encoding used for bulk requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    /// Newline-delimited JSON over the REST bulk API
    #[default]
    Json,
    /// Protobuf bulk messages over gRPC
    Protobuf,
}

/// Load execution configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoadConfig {
    pub encoding: WireEncoding,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_configuration() {
        let config = ClusterBenchConfig::default();

        assert_eq!(config.builder.cluster_config_path, PathBuf::from("./cluster_configs"));
        assert!(config.builder.distribution_cache);
        assert!(config.builder.parallel_hosts);
        assert!(config.builder.plugins.is_empty());
        assert_eq!(config.provisioner.kind, ProvisionerKind::Static);
        assert_eq!(config.load.encoding, WireEncoding::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ClusterBenchConfig::default();

        config.builder.distribution_url = "  ".to_string();
        assert!(config.validate().is_err());

        config.builder.distribution_url = DEFAULT_DISTRIBUTION_URL.to_string();
        config.provisioner.hosts.push(Host::new("node-0", ""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = config::Map::new();
        env.insert(
            "CLUSTERBENCH__BUILDER__DISTRIBUTION_VERSION".to_string(),
            "2.11.0".to_string(),
        );
        env.insert("CLUSTERBENCH__LOAD__ENCODING".to_string(), "protobuf".to_string());
        // single underscore after the prefix is not picked up
        env.insert(
            "CLUSTERBENCH_BUILDER__DISTRIBUTION_URL".to_string(),
            "http://ignored".to_string(),
        );

        let builder = ClusterBenchConfig::set_defaults(Config::builder()).unwrap();
        let config: ClusterBenchConfig = builder
            .add_source(ClusterBenchConfig::environment().source(Some(env)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.builder.distribution_version.as_deref(), Some("2.11.0"));
        assert_eq!(config.load.encoding, WireEncoding::Protobuf);
        assert_eq!(config.builder.distribution_url, DEFAULT_DISTRIBUTION_URL);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clusterbench.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
builder:
  distribution_version: "2.11.0"
  plugins: ["analysis-icu", "security"]
  plugin_params:
    gcs_client_name: default
provisioner:
  hosts:
    - name: node-0
      address: 10.0.0.1
load:
  encoding: protobuf
"#
        )
        .unwrap();

        let config = ClusterBenchConfig::from_file(&path).unwrap();
        assert_eq!(config.builder.distribution_version.as_deref(), Some("2.11.0"));
        assert_eq!(config.builder.plugins, vec!["analysis-icu", "security"]);
        assert_eq!(
            config.builder.plugin_params.get("gcs_client_name").map(String::as_str),
            Some("default")
        );
        assert_eq!(config.provisioner.hosts, vec![Host::new("node-0", "10.0.0.1")]);
        assert_eq!(config.load.encoding, WireEncoding::Protobuf);
        // untouched sections keep their defaults
        assert!(config.builder.distribution_cache);
    }
}
