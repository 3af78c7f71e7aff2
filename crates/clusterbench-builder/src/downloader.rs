use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use clusterbench_core::{Artifacts, CoreError, CoreResult, Downloader, Executor, Host};

use crate::artifact_variables::ArtifactVariablesProvider;
use crate::template::TemplateRenderer;

/// Artifact key under which the distribution archive is returned.
pub const DISTRIBUTION: &str = "distribution";

/// Downloads the search distribution archive onto each host.
pub struct DistributionDownloader {
    executor: Arc<dyn Executor>,
    variables: ArtifactVariablesProvider,
    renderer: TemplateRenderer,
    url_template: String,
    version: String,
    root: PathBuf,
    cache: bool,
}

impl DistributionDownloader {
    pub fn new(
        executor: Arc<dyn Executor>,
        url_template: impl Into<String>,
        version: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            variables: ArtifactVariablesProvider::new(executor.clone()),
            executor,
            renderer: TemplateRenderer::new(),
            url_template: url_template.into(),
            version: version.into(),
            root: root.into(),
            cache: true,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Renders the download URL for a host.
    pub async fn download_url(&self, host: &Host) -> CoreResult<String> {
        let variables = self.variables.variables(host, Some(&self.version)).await?;
        self.renderer.render_str(&self.url_template, &variables)
    }

    async fn is_present(&self, host: &Host, path: &str) -> bool {
        self.executor
            .execute(host, &format!("test -f {path}"), false)
            .await
            .is_ok()
    }
}

/// File name is the last path segment of the URL.
fn file_name_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[async_trait]
impl Downloader for DistributionDownloader {
    async fn download(&self, host: &Host) -> CoreResult<Artifacts> {
        let url = self.download_url(host).await?;
        let file_name = file_name_from_url(&url);
        if file_name.is_empty() {
            return Err(CoreError::ValidationError(format!(
                "download URL [{url}] does not name a file"
            )));
        }

        let distributions = self.root.join("distributions");
        self.executor
            .execute(host, &format!("mkdir -m 0777 -p {}", distributions.display()), false)
            .await?;

        let path = distributions.join(file_name);
        let path_str = path.display().to_string();

        if self.cache && self.is_present(host, &path_str).await {
            info!(host = %host.name, version = %self.version, path = %path_str, "skipping download, found existing binary");
        } else {
            info!(host = %host.name, version = %self.version, %url, "downloading distribution");
            self.executor
                .execute(host, &format!("curl -o {path_str} {url}"), false)
                .await
                .map_err(|err| {
                    error!(host = %host.name, %url, %err, "distribution download failed");
                    err
                })?;
        }

        let mut artifacts = Artifacts::new();
        artifacts.insert(DISTRIBUTION.to_string(), path);
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    const URL: &str = "https://example.org/{{VERSION}}/opensearch-{{VERSION}}-{{OSNAME}}-{{ARCH}}.tar.gz";

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("https://a/b/c.tar.gz"), "c.tar.gz");
        assert_eq!(file_name_from_url("c.tar.gz"), "c.tar.gz");
    }

    #[tokio::test]
    async fn test_download_when_absent() {
        let executor = Arc::new(MockExecutor::with_outputs(&["Linux", "x86_64"]).fail_on("test -f", 1));
        let downloader = DistributionDownloader::new(executor.clone(), URL, "2.11.0", "/opt/bench");

        let artifacts = downloader.download(&Host::new("a", "10.0.0.1")).await.unwrap();

        assert_eq!(
            artifacts.get(DISTRIBUTION),
            Some(&PathBuf::from("/opt/bench/distributions/opensearch-2.11.0-linux-x64.tar.gz"))
        );
        let commands = executor.commands();
        assert!(commands.contains(
            &"curl -o /opt/bench/distributions/opensearch-2.11.0-linux-x64.tar.gz https://example.org/2.11.0/opensearch-2.11.0-linux-x64.tar.gz".to_string()
        ));
    }

    #[tokio::test]
    async fn test_cached_binary_is_reused() {
        let executor = Arc::new(MockExecutor::with_outputs(&["Linux", "aarch64"]));
        let downloader = DistributionDownloader::new(executor.clone(), URL, "2.11.0", "/opt/bench");

        downloader.download(&Host::new("a", "10.0.0.1")).await.unwrap();

        assert!(!executor.commands().iter().any(|c| c.starts_with("curl")));
    }

    #[tokio::test]
    async fn test_cache_disabled_always_downloads() {
        let executor = Arc::new(MockExecutor::with_outputs(&["Linux", "aarch64"]));
        let downloader =
            DistributionDownloader::new(executor.clone(), URL, "2.11.0", "/opt/bench").with_cache(false);

        downloader.download(&Host::new("a", "10.0.0.1")).await.unwrap();

        assert!(executor.commands().iter().any(|c| c.starts_with("curl")));
    }
}
