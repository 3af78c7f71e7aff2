use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Template variables handed to installers, URL templates and bootstrap hooks.
pub type Variables = BTreeMap<String, String>;

/// A machine participating in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Host {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            metadata: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// A search node installed on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub host_name: String,
    pub install_root: PathBuf,
    pub binary_path: PathBuf,
    /// Process id once launched.
    pub pid: Option<u32>,
    /// Variables produced at install time (install root, node name, node ip, plugin params).
    pub variables: Variables,
}

impl Node {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// Lifecycle position of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterState {
    Provisioned,
    Installed,
    Launched,
    TornDown,
}

/// Hosts and nodes owned by one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Uuid,
    pub name: String,
    pub state: ClusterState,
    pub hosts: Vec<Host>,
    /// Installed nodes keyed by host name.
    pub nodes: BTreeMap<String, Node>,
    pub created_at: DateTime<Utc>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, hosts: Vec<Host>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: ClusterState::Provisioned,
            hosts,
            nodes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn node(&self, host: &Host) -> Option<&Node> {
        self.nodes.get(&host.name)
    }

    /// Nodes that have a live process.
    pub fn running_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_running())
    }

    pub fn node_addresses(&self) -> Vec<String> {
        self.hosts.iter().map(|host| host.address.clone()).collect()
    }
}
