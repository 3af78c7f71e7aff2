//! Cluster lifecycle behaviour with scripted collaborators.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use clusterbench_builder::{
    active_names, BareInstaller, BootstrapHookRegistry, ClusterBuilder, DistributionDownloader,
    LifecycleStage, MockExecutor, ProcessLauncher, StaticProvisioner,
};
use clusterbench_core::{
    Artifacts, ClusterBenchConfig, ClusterState, CoreError, CoreResult, Downloader, Host, Installer, Launcher, Node,
    PluginConfigInstance, Provisioner, Variables,
};

type Log = Arc<Mutex<Vec<String>>>;

struct ScriptedProvisioner {
    hosts: Vec<Host>,
    log: Log,
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn provision(&self) -> CoreResult<Vec<Host>> {
        Ok(self.hosts.clone())
    }

    async fn tear_down(&self, host: &Host) -> CoreResult<()> {
        self.log.lock().push(format!("tear_down {}", host.name));
        if host.name == "a" {
            return Err(CoreError::setup("provisioner", "host a refused to release"));
        }
        Ok(())
    }
}

struct ScriptedDownloader;

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn download(&self, _host: &Host) -> CoreResult<Artifacts> {
        let mut artifacts = Artifacts::new();
        artifacts.insert("distribution".to_string(), PathBuf::from("/dist.tar.gz"));
        Ok(artifacts)
    }
}

struct ScriptedInstaller {
    fail_on: &'static str,
    log: Log,
}

#[async_trait]
impl Installer for ScriptedInstaller {
    async fn install(&self, host: &Host, _artifacts: &Artifacts, _ips: &[String]) -> CoreResult<Node> {
        self.log.lock().push(format!("install {}", host.name));
        if host.name == self.fail_on {
            return Err(CoreError::setup(host.name.clone(), "disk full"));
        }
        Ok(Node {
            name: format!("node-{}", host.name),
            host_name: host.name.clone(),
            install_root: PathBuf::from(format!("/opt/{}", host.name)),
            binary_path: PathBuf::from(format!("/opt/{}/bin/opensearch", host.name)),
            pid: None,
            variables: Variables::new(),
        })
    }

    async fn cleanup(&self, host: &Host) -> CoreResult<()> {
        self.log.lock().push(format!("cleanup {}", host.name));
        Ok(())
    }
}

struct ScriptedLauncher {
    log: Log,
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn start(&self, host: &Host, node: &Node) -> CoreResult<Node> {
        self.log.lock().push(format!("start {}", host.name));
        Ok(Node {
            pid: Some(1000),
            ..node.clone()
        })
    }

    async fn stop(&self, host: &Host, _node: &Node) -> CoreResult<()> {
        self.log.lock().push(format!("stop {}", host.name));
        Ok(())
    }
}

fn scripted_builder(fail_on: &'static str, log: &Log) -> ClusterBuilder {
    ClusterBuilder::new(
        "bench",
        Arc::new(ScriptedProvisioner {
            hosts: vec![Host::new("a", "10.0.0.1"), Host::new("b", "10.0.0.2")],
            log: log.clone(),
        }),
        Arc::new(ScriptedDownloader),
        Arc::new(ScriptedInstaller {
            fail_on,
            log: log.clone(),
        }),
        Arc::new(ScriptedLauncher { log: log.clone() }),
        Arc::new(MockExecutor::new()),
    )
}

fn entries(log: &Log, prefix: &str) -> Vec<String> {
    let mut matching: Vec<String> = log
        .lock()
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .cloned()
        .collect();
    matching.sort();
    matching
}

#[tokio::test]
async fn test_install_failure_on_one_host_prevents_any_launch() {
    let log = Log::default();
    let builder = scripted_builder("b", &log);

    let err = builder.create_cluster().await.unwrap_err();

    assert_eq!(err.stage, LifecycleStage::Install);
    assert!(entries(&log, "start").is_empty(), "nothing may launch: {:?}", log.lock());
    assert_eq!(entries(&log, "install"), vec!["install a", "install b"]);
    // automatic teardown reaches both hosts
    assert_eq!(entries(&log, "tear_down"), vec!["tear_down a", "tear_down b"]);

    // an explicit delete still walks every host even though host a keeps failing
    let mut cluster = *err.cluster.expect("partial cluster is returned");
    log.lock().clear();
    let err = builder.delete_cluster(&mut cluster).await.unwrap_err();

    assert!(matches!(err, CoreError::Teardown { ref failures } if failures.len() == 1));
    assert_eq!(entries(&log, "cleanup"), vec!["cleanup a", "cleanup b"]);
    assert_eq!(entries(&log, "tear_down"), vec!["tear_down a", "tear_down b"]);
    assert_eq!(cluster.state, ClusterState::TornDown);
}

#[tokio::test]
async fn test_create_and_delete_cluster() {
    let log = Log::default();
    let builder = scripted_builder("none", &log).with_parallel(false);

    let mut cluster = builder.create_cluster().await.unwrap();

    assert_eq!(cluster.state, ClusterState::Launched);
    assert_eq!(cluster.running_nodes().count(), 2);
    assert_eq!(
        log.lock().clone(),
        vec!["install a", "install b", "start a", "start b"]
    );

    log.lock().clear();
    // host a fails to release in the scripted provisioner
    assert!(builder.delete_cluster(&mut cluster).await.is_err());
    assert_eq!(entries(&log, "stop"), vec!["stop a", "stop b"]);
    assert_eq!(cluster.running_nodes().count(), 0);
}

#[tokio::test]
async fn test_bootstrap_failure_aborts_creation() {
    let executor = Arc::new(
        MockExecutor::with_outputs(&["Linux", "x86_64", "Linux", "x86_64"])
            .fail_on("opensearch-users useradd", 1),
    );
    let hosts = vec![Host::new("a", "127.0.0.1"), Host::new("b", "127.0.0.2")];
    let plugins = vec![PluginConfigInstance::configured("security", "v1", "security")];
    let registry = BootstrapHookRegistry::for_plugins(&plugins).unwrap();

    let builder = ClusterBuilder::new(
        "bench",
        Arc::new(StaticProvisioner::new(hosts)),
        Arc::new(DistributionDownloader::new(
            executor.clone(),
            "https://example.org/opensearch-{{VERSION}}-{{OSNAME}}-{{ARCH}}.tar.gz",
            "2.11.0",
            "/opt/bench",
        )),
        Arc::new(BareInstaller::new(executor.clone(), "bench", "/opt/bench", plugins.clone())),
        Arc::new(ProcessLauncher::new(executor.clone())),
        executor.clone(),
    )
    .with_hooks(Arc::new(registry), active_names(&plugins))
    .with_parallel(false);

    let err = builder.create_cluster().await.unwrap_err();

    assert_eq!(err.stage, LifecycleStage::Bootstrap);
    assert!(matches!(err.source, CoreError::Setup { ref component, .. } if component == "security"));
    assert!(err.source.to_string().contains("opensearch-users has exited with code [1]"));
    assert!(!executor.commands().iter().any(|c| c.contains(" -d -p ")));
    assert!(executor.commands().contains(&"rm -rf /opt/bench/a".to_string()));
}

#[tokio::test]
async fn test_end_to_end_with_concrete_collaborators() {
    let executor = Arc::new(MockExecutor::with_outputs(&[
        "Linux", "aarch64", "Linux", "aarch64", "101", "102",
    ]));
    let hosts = vec![Host::new("a", "127.0.0.1"), Host::new("b", "127.0.0.2")];
    let provisioner = Arc::new(StaticProvisioner::new(hosts.clone()));

    let builder = ClusterBuilder::new(
        "bench",
        provisioner.clone(),
        Arc::new(DistributionDownloader::new(
            executor.clone(),
            "https://example.org/opensearch-{{VERSION}}-{{OSNAME}}-{{ARCH}}.tar.gz",
            "2.11.0",
            "/opt/bench",
        )),
        Arc::new(BareInstaller::new(executor.clone(), "bench", "/opt/bench", Vec::new())),
        Arc::new(ProcessLauncher::new(executor.clone())),
        executor.clone(),
    )
    .with_parallel(false);

    let mut cluster = builder.create_cluster().await.unwrap();

    let pids: Vec<_> = cluster.nodes.values().map(|node| node.pid).collect();
    assert_eq!(pids, vec![Some(101), Some(102)]);
    assert!(executor
        .commands_on("a")
        .contains(&"tar -xzf /opt/bench/distributions/opensearch-2.11.0-linux-arm64.tar.gz -C /opt/bench/a --strip-components=1".to_string()));

    builder.delete_cluster(&mut cluster).await.unwrap();
    assert!(executor.commands_on("b").contains(&"kill 102".to_string()));
    assert!(hosts.iter().all(|host| provisioner.is_released(host)));
}

#[tokio::test]
async fn test_plugin_configuration_reaches_node_and_hooks() {
    let tree = tempfile::TempDir::new().unwrap();
    let plugin = tree.path().join("plugins/v1/repository_gcs");
    fs::create_dir_all(plugin.join("default/templates/config")).unwrap();
    fs::write(
        plugin.join("default.ini"),
        "[config]\nbase = default\n\n[variables]\ngcs_client_name = bench\n",
    )
    .unwrap();
    fs::write(
        plugin.join("default/templates/config/gcs.yml"),
        "gcs.client: {{ gcs_client_name }}\n",
    )
    .unwrap();

    let mut config = ClusterBenchConfig::default();
    config.builder.cluster_config_path = tree.path().to_path_buf();
    config.builder.install_root = PathBuf::from("/opt/bench");
    config.builder.distribution_version = Some("2.11.0".to_string());
    config.builder.plugins = vec!["repository-gcs".to_string()];
    config
        .builder
        .plugin_params
        .insert("gcs_credentials_file".to_string(), "/secrets/gcs.json".to_string());
    config.provisioner.hosts = vec![Host::new("a", "127.0.0.1")];

    let executor = Arc::new(MockExecutor::with_outputs(&["Linux", "x86_64", "101"]));
    let builder = ClusterBuilder::from_config("bench", &config, executor.clone()).unwrap();

    let cluster = builder.create_cluster().await.unwrap();

    let node = &cluster.nodes["a"];
    assert_eq!(node.variables["gcs_client_name"], "bench");
    assert_eq!(node.variables["gcs_credentials_file"], "/secrets/gcs.json");
    assert!(executor.commands().contains(
        &"/opt/bench/a/bin/opensearch-keystore --silent add-file gcs.client.bench.credentials_file /secrets/gcs.json"
            .to_string()
    ));

    let copies = executor.copies();
    let gcs = copies
        .iter()
        .find(|copy| copy.destination == PathBuf::from("/opt/bench/a/config/gcs.yml"))
        .expect("plugin template copied into the node");
    assert_eq!(gcs.content, "gcs.client: bench");
}
