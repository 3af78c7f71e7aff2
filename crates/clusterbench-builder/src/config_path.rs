use std::path::{Path, PathBuf};

use clusterbench_core::{ConfigInstanceType, CoreError, CoreResult};

/// Locates `<root>/<config-type>/v<version>` directories in the cluster config tree.
#[derive(Debug, Clone)]
pub struct ConfigPathResolver {
    root: PathBuf,
}

impl ConfigPathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the directory for a config family and format version.
    ///
    /// # Errors
    ///
    /// Returns a setup error if the directory does not exist.
    pub fn resolve_config_path(&self, config_type: ConfigInstanceType, version: u32) -> CoreResult<PathBuf> {
        let path = self
            .root
            .join(config_type.config_type())
            .join(format!("v{version}"));

        if !path.is_dir() {
            return Err(CoreError::setup(
                config_type.config_type(),
                format!("Path {} for {} does not exist.", path.display(), config_type.config_type()),
            ));
        }

        Ok(path)
    }
}
