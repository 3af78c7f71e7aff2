use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Machine architecture as reported by a host and as named by release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchitectureType {
    Arm,
    X86,
}

impl ArchitectureType {
    /// Every supported architecture.
    pub const ALL: [ArchitectureType; 2] = [ArchitectureType::Arm, ArchitectureType::X86];

    /// Name reported by `uname -m`.
    pub fn hardware_name(self) -> &'static str {
        match self {
            Self::Arm => "aarch64",
            Self::X86 => "x86_64",
        }
    }

    /// Name used in distribution artifact file names.
    pub fn platform_name(self) -> &'static str {
        match self {
            Self::Arm => "arm64",
            Self::X86 => "x64",
        }
    }

    /// Looks up the architecture for a hardware name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for hardware names outside the table.
    /// Provisioning must stop here rather than fetch artifacts for a guessed platform.
    pub fn from_hardware_name(hardware_name: &str) -> CoreResult<Self> {
        let normalized = hardware_name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|arch| arch.hardware_name() == normalized)
            .ok_or_else(|| CoreError::not_found("architecture", hardware_name))
    }
}

/// Maps a host-reported hardware name to its artifact platform name.
pub fn resolve(hardware_name: &str) -> CoreResult<&'static str> {
    ArchitectureType::from_hardware_name(hardware_name).map(ArchitectureType::platform_name)
}
