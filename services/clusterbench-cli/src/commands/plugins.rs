use std::path::Path;

use anyhow::{Context, Result};

use clusterbench_builder::{ConfigPathResolver, PluginConfigInstanceLister};
use clusterbench_core::PluginConfigInstance;

pub fn list(root: &Path) -> Result<()> {
    let lister = PluginConfigInstanceLister::new(ConfigPathResolver::new(root));
    let instances = lister
        .list_plugin_config_instances()
        .with_context(|| format!("failed to list plugins under {}", root.display()))?;

    println!("Available plugins:\n");
    for instance in &instances {
        println!("{}", describe(instance));
    }
    Ok(())
}

fn describe(instance: &PluginConfigInstance) -> String {
    let kind = if instance.is_core_plugin { "core" } else { "user" };
    match instance.config_names.as_deref() {
        Some(names) if !names.is_empty() => {
            format!("{:<30} {:<4} {} [{}]", instance.name, kind, instance.format_version, names.join(", "))
        }
        _ => format!("{:<30} {:<4} {}", instance.name, kind, instance.format_version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let core = PluginConfigInstance::core("analysis-icu", "v1");
        assert!(describe(&core).starts_with("analysis-icu"));
        assert!(describe(&core).ends_with("core v1"));

        let configured = PluginConfigInstance::configured("complex-plugin", "v1", "config-a");
        assert!(describe(&configured).ends_with("user v1 [config-a]"));
    }
}
