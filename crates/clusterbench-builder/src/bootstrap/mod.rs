//! Phase-keyed registry of hooks that run against freshly installed nodes.
//!
//! Components register hooks once, before the lifecycle starts. The registry
//! is then shared read-only across every per-host pipeline.

pub mod keystore;
pub mod security;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use clusterbench_core::{
    BootstrapPhase, CoreError, CoreResult, Executor, Host, PluginConfigInstance, Variables,
};

/// Everything a hook sees when it is invoked.
pub struct HookContext<'a> {
    /// Component that registered the hook.
    pub component: &'a str,
    /// Names of the components selected for this run, including sub-configuration names.
    pub active: &'a [String],
    pub variables: &'a Variables,
    pub host: &'a Host,
    pub executor: &'a dyn Executor,
}

impl HookContext<'_> {
    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|active| active == name)
    }

    /// Looks up a variable every installed node is expected to carry.
    pub fn required(&self, key: &str) -> CoreResult<&str> {
        self.variables
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| CoreError::setup(self.component, format!("variable [{key}] is not set")))
    }

    /// Path of a binary shipped in the node's `bin` directory.
    pub fn binary(&self, name: &str) -> CoreResult<PathBuf> {
        Ok(PathBuf::from(self.required("install_root_path")?).join("bin").join(name))
    }
}

/// A callback run at a bootstrap phase.
///
/// Returns `true` when it did work and `false` when it had nothing to do.
/// Errors abort cluster creation.
#[async_trait]
pub trait BootstrapHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, ctx: &HookContext<'_>) -> CoreResult<bool>;
}

struct RegisteredHook {
    component: String,
    hook: Arc<dyn BootstrapHook>,
}

#[derive(Default)]
pub struct BootstrapHookRegistry {
    hooks: BTreeMap<BootstrapPhase, Vec<RegisteredHook>>,
}

impl BootstrapHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `hook` to the hooks of `phase`. Unknown phase names are rejected.
    pub fn register(
        &mut self,
        phase: &str,
        component: impl Into<String>,
        hook: Arc<dyn BootstrapHook>,
    ) -> CoreResult<()> {
        let phase: BootstrapPhase = phase.parse()?;
        let component = component.into();
        debug!(%phase, %component, hook = hook.name(), "registering bootstrap hook");

        self.hooks
            .entry(phase)
            .or_default()
            .push(RegisteredHook { component, hook });
        Ok(())
    }

    /// Builds the registry for the selected plugins from the built-in hook catalog.
    pub fn for_plugins(plugins: &[PluginConfigInstance]) -> CoreResult<Self> {
        let mut registry = Self::new();
        let mut seen: Vec<&str> = Vec::new();

        for plugin in plugins {
            if seen.contains(&plugin.name.as_str()) {
                continue;
            }
            seen.push(&plugin.name);

            match plugin.name.as_str() {
                security::COMPONENT => {
                    security::register(&mut registry, &plugin.name, plugin.root_path.clone())?
                }
                keystore::COMPONENT => keystore::register(&mut registry, &plugin.name)?,
                _ => {}
            }
        }
        Ok(registry)
    }

    pub fn hook_count(&self, phase: BootstrapPhase) -> usize {
        self.hooks.get(&phase).map_or(0, Vec::len)
    }

    /// Runs every hook of `phase` on `host` in registration order.
    ///
    /// Returns how many hooks did work. The first failure stops the phase.
    pub async fn run(
        &self,
        phase: BootstrapPhase,
        active: &[String],
        variables: &Variables,
        host: &Host,
        executor: &dyn Executor,
    ) -> CoreResult<usize> {
        let Some(hooks) = self.hooks.get(&phase) else {
            return Ok(0);
        };

        let mut performed = 0;
        for registered in hooks {
            let ctx = HookContext {
                component: &registered.component,
                active,
                variables,
                host,
                executor,
            };

            match registered.hook.invoke(&ctx).await {
                Ok(true) => {
                    info!(%phase, host = %host.name, component = %registered.component, hook = registered.hook.name(), "bootstrap hook finished");
                    performed += 1;
                }
                Ok(false) => {
                    debug!(%phase, host = %host.name, component = %registered.component, hook = registered.hook.name(), "bootstrap hook skipped");
                }
                Err(err) => {
                    error!(%phase, host = %host.name, component = %registered.component, hook = registered.hook.name(), %err, "bootstrap hook failed");
                    return Err(match err {
                        err @ CoreError::Setup { .. } => err,
                        other => CoreError::setup(registered.component.clone(), other.to_string()),
                    });
                }
            }
        }
        Ok(performed)
    }
}

/// Runs a node binary, turning a non-zero exit into a setup error for the hook's component.
pub(crate) async fn run_binary(
    ctx: &HookContext<'_>,
    binary: &str,
    command: &str,
    failure: &str,
) -> CoreResult<()> {
    match ctx.executor.execute(ctx.host, command, false).await {
        Ok(_) => Ok(()),
        Err(err) => {
            let exited = match err.exit_code() {
                Some(code) => format!("{binary} has exited with code [{code}]"),
                None => format!("{binary} could not be run: {err}"),
            };
            error!(host = %ctx.host.name, component = ctx.component, "{exited}");
            Err(CoreError::setup(ctx.component, format!("{failure} {exited}.")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use parking_lot::Mutex;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        outcome: fn() -> CoreResult<bool>,
    }

    #[async_trait]
    impl BootstrapHook for Recording {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn invoke(&self, _ctx: &HookContext<'_>) -> CoreResult<bool> {
            self.log.lock().push(self.label);
            (self.outcome)()
        }
    }

    fn hook(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, outcome: fn() -> CoreResult<bool>) -> Arc<dyn BootstrapHook> {
        Arc::new(Recording {
            label,
            log: log.clone(),
            outcome,
        })
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BootstrapHookRegistry::new();
        registry.register("post_install", "x", hook("first", &log, || Ok(true))).unwrap();
        registry.register("post_install", "x", hook("second", &log, || Ok(false))).unwrap();
        registry.register("post_install", "y", hook("third", &log, || Ok(true))).unwrap();

        let performed = registry
            .run(
                BootstrapPhase::PostInstall,
                &[],
                &Variables::new(),
                &Host::new("a", "10.0.0.1"),
                &MockExecutor::new(),
            )
            .await
            .unwrap();

        assert_eq!(performed, 2);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failure_stops_phase_and_names_component() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BootstrapHookRegistry::new();
        registry
            .register("post_install", "broken-plugin", hook("boom", &log, || Err(CoreError::launch("no"))))
            .unwrap();
        registry.register("post_install", "x", hook("after", &log, || Ok(true))).unwrap();

        let err = registry
            .run(
                BootstrapPhase::PostInstall,
                &[],
                &Variables::new(),
                &Host::new("a", "10.0.0.1"),
                &MockExecutor::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Setup { ref component, .. } if component == "broken-plugin"));
        assert_eq!(*log.lock(), vec!["boom"]);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BootstrapHookRegistry::new();
        let err = registry
            .register("pre_launch", "x", hook("h", &log, || Ok(true)))
            .unwrap_err();

        assert!(err.to_string().contains("Valid phases are: [\"post_install\"]"));
        assert_eq!(registry.hook_count(BootstrapPhase::PostInstall), 0);
    }

    #[test]
    fn test_catalog_registers_known_plugins_once() {
        let plugins = vec![
            PluginConfigInstance::core("analysis-icu", "v1"),
            PluginConfigInstance::configured("security", "v1", "security"),
            PluginConfigInstance::configured("security", "v1", "security-demo"),
            PluginConfigInstance::core("repository-gcs", "v1"),
        ];

        let registry = BootstrapHookRegistry::for_plugins(&plugins).unwrap();
        assert_eq!(registry.hook_count(BootstrapPhase::PostInstall), 3);
    }
}
