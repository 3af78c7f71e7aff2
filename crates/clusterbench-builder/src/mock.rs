use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use clusterbench_core::{CoreError, CoreResult, Executor, Host};

/// A command seen by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub host: String,
    pub command: String,
}

/// A file copy seen by [`MockExecutor`], with the source content at copy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCopy {
    pub host: String,
    pub destination: PathBuf,
    pub content: String,
}

/// Mock executor for testing.
///
/// Records every command, replays queued stdout for `output` calls in order,
/// and fails commands containing a configured pattern with a given exit code.
/// Lets lifecycle tests run without touching real hosts.
#[derive(Default)]
pub struct MockExecutor {
    outputs: Mutex<VecDeque<Vec<String>>>,
    failures: Vec<(String, i32)>,
    commands: Mutex<Vec<RecordedCommand>>,
    copies: Mutex<Vec<RecordedCopy>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues single-line outputs, one per `output` call.
    #[must_use]
    pub fn with_outputs(lines: &[&str]) -> Self {
        let executor = Self::default();
        for line in lines {
            executor.push_output(vec![line.to_string()]);
        }
        executor
    }

    pub fn push_output(&self, lines: Vec<String>) {
        self.outputs.lock().push_back(lines);
    }

    /// Fails every command containing `pattern` with exit code `code`.
    #[must_use]
    pub fn fail_on(mut self, pattern: impl Into<String>, code: i32) -> Self {
        self.failures.push((pattern.into(), code));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().iter().map(|c| c.command.clone()).collect()
    }

    pub fn commands_on(&self, host: &str) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter(|c| c.host == host)
            .map(|c| c.command.clone())
            .collect()
    }

    pub fn copies(&self) -> Vec<RecordedCopy> {
        self.copies.lock().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, host: &Host, command: &str, output: bool) -> CoreResult<Vec<String>> {
        self.commands.lock().push(RecordedCommand {
            host: host.name.clone(),
            command: command.to_string(),
        });

        if let Some((_, code)) = self.failures.iter().find(|(pattern, _)| command.contains(pattern.as_str())) {
            return Err(CoreError::executor(command, host.name.clone(), Some(*code)));
        }

        if output {
            Ok(self.outputs.lock().pop_front().unwrap_or_default())
        } else {
            Ok(Vec::new())
        }
    }

    async fn copy(&self, host: &Host, source: &Path, destination: &Path) -> CoreResult<()> {
        let content = String::from_utf8_lossy(&tokio::fs::read(source).await?).into_owned();
        self.copies.lock().push(RecordedCopy {
            host: host.name.clone(),
            destination: destination.to_path_buf(),
            content,
        });
        Ok(())
    }
}
