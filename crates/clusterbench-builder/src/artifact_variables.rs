use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use clusterbench_core::{architecture, CoreError, CoreResult, Executor, Host, Variables};

/// Per-host values substituted into artifact download URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactVariables {
    #[serde(rename = "VERSION")]
    pub version: Option<String>,
    #[serde(rename = "OSNAME")]
    pub os_name: String,
    #[serde(rename = "ARCH")]
    pub arch: String,
}

impl ArtifactVariables {
    /// Flattens into template variables. `VERSION` is omitted when absent.
    pub fn to_variables(&self) -> Variables {
        let mut variables = Variables::new();
        if let Some(version) = &self.version {
            variables.insert("VERSION".to_string(), version.clone());
        }
        variables.insert("OSNAME".to_string(), self.os_name.clone());
        variables.insert("ARCH".to_string(), self.arch.clone());
        variables
    }
}

/// Derives OS name and architecture of a host by querying it.
#[derive(Clone)]
pub struct ArtifactVariablesProvider {
    executor: Arc<dyn Executor>,
}

impl ArtifactVariablesProvider {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Runs `uname` and `uname -m` on the host. Executor failures are returned as-is.
    pub async fn variables(&self, host: &Host, version: Option<&str>) -> CoreResult<ArtifactVariables> {
        let os_name = self.first_line(host, "uname").await?.to_lowercase();
        let hardware_name = self.first_line(host, "uname -m").await?.to_lowercase();
        let arch = architecture::resolve(&hardware_name)?.to_string();

        debug!(host = %host.name, %os_name, %arch, "resolved artifact variables");

        Ok(ArtifactVariables {
            version: version.map(str::to_string),
            os_name,
            arch,
        })
    }

    async fn first_line(&self, host: &Host, command: &str) -> CoreResult<String> {
        self.executor
            .execute(host, command, true)
            .await?
            .into_iter()
            .next()
            .map(|line| line.trim().to_string())
            .ok_or_else(|| CoreError::setup(host.name.clone(), format!("`{command}` produced no output")))
    }
}
