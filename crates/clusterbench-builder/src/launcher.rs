use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use clusterbench_core::{CoreError, CoreResult, Executor, Host, Launcher, Node};

const PID_FILE: &str = "node.pid";

/// Starts nodes as daemons and tracks them through their pid file.
pub struct ProcessLauncher {
    executor: Arc<dyn Executor>,
}

impl ProcessLauncher {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

fn parse_pid(lines: &[String]) -> CoreResult<u32> {
    let line = lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .ok_or_else(|| CoreError::launch("pid file is empty"))?;

    line.parse::<u32>()
        .map_err(|err| CoreError::launch(format!("invalid pid [{line}]: {err}")))
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn start(&self, host: &Host, node: &Node) -> CoreResult<Node> {
        let pid_file = node.install_root.join(PID_FILE);
        let command = format!("{} -d -p {}", node.binary_path.display(), pid_file.display());

        info!(host = %host.name, node = %node.name, "starting node");
        self.executor
            .execute(host, &command, false)
            .await
            .map_err(|err| CoreError::launch(format!("node [{}] failed to start: {err}", node.name)))?;

        let lines = self
            .executor
            .execute(host, &format!("cat {}", pid_file.display()), true)
            .await?;
        let pid = parse_pid(&lines)?;

        info!(host = %host.name, node = %node.name, pid, "node started");
        Ok(Node {
            pid: Some(pid),
            ..node.clone()
        })
    }

    async fn stop(&self, host: &Host, node: &Node) -> CoreResult<()> {
        let Some(pid) = node.pid else {
            debug!(host = %host.name, node = %node.name, "node not running");
            return Ok(());
        };

        info!(host = %host.name, node = %node.name, pid, "stopping node");
        self.executor
            .execute(host, &format!("kill {pid}"), false)
            .await
            .map(|_| ())
    }
}
