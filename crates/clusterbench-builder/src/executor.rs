use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use clusterbench_core::{CoreError, CoreResult, Executor, Host};

/// Runs commands through `sh -c` on the machine running the benchmark.
///
/// Suitable when every host is the local machine, e.g. single-node runs.
#[derive(Debug, Clone, Default)]
pub struct LocalShellExecutor;

impl LocalShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for LocalShellExecutor {
    async fn execute(&self, host: &Host, command: &str, output: bool) -> CoreResult<Vec<String>> {
        debug!(host = %host.name, command, "executing");

        let result = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(host = %host.name, command, code = ?result.status.code(), stderr = %stderr.trim(), "command failed");
            return Err(CoreError::executor(command, host.name.clone(), result.status.code()));
        }

        if !output {
            return Ok(Vec::new());
        }

        Ok(String::from_utf8_lossy(&result.stdout)
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect())
    }

    async fn copy(&self, host: &Host, source: &Path, destination: &Path) -> CoreResult<()> {
        debug!(host = %host.name, source = %source.display(), destination = %destination.display(), "copying");

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, destination).await?;
        Ok(())
    }
}
