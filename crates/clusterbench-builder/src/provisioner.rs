use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use clusterbench_core::{CoreError, CoreResult, Host, Provisioner, ProvisionerConfig, ProvisionerKind};

/// Hands out hosts listed in configuration. Releasing a host only marks it free.
pub struct StaticProvisioner {
    hosts: Vec<Host>,
    released: Mutex<HashSet<String>>,
}

impl StaticProvisioner {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts,
            released: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_released(&self, host: &Host) -> bool {
        self.released.lock().contains(&host.name)
    }
}

#[async_trait]
impl Provisioner for StaticProvisioner {
    async fn provision(&self) -> CoreResult<Vec<Host>> {
        if self.hosts.is_empty() {
            return Err(CoreError::ValidationError(
                "static provisioner has no hosts configured".to_string(),
            ));
        }

        self.released.lock().clear();
        info!(hosts = self.hosts.len(), "provisioned static hosts");
        Ok(self.hosts.clone())
    }

    async fn tear_down(&self, host: &Host) -> CoreResult<()> {
        if self.released.lock().insert(host.name.clone()) {
            info!(host = %host.name, "released host");
        } else {
            debug!(host = %host.name, "host already released");
        }
        Ok(())
    }
}

/// Builds the provisioner selected by configuration.
pub fn provisioner_for(config: &ProvisionerConfig) -> Arc<dyn Provisioner> {
    match config.kind {
        ProvisionerKind::Static => Arc::new(StaticProvisioner::new(config.hosts.clone())),
    }
}
