use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle point at which bootstrap hooks run.
///
/// Phases are ordered by their numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum BootstrapPhase {
    PostInstall = 10,
}

impl BootstrapPhase {
    pub const ALL: [BootstrapPhase; 1] = [BootstrapPhase::PostInstall];

    pub fn name(self) -> &'static str {
        match self {
            Self::PostInstall => "post_install",
        }
    }

    pub fn value(self) -> u32 {
        self as u32
    }

    /// Names of every known phase.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|phase| phase.name()).collect()
    }

    pub fn is_valid(name: &str) -> bool {
        Self::ALL.iter().any(|phase| phase.name() == name)
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BootstrapPhase {
    type Err = CoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.name() == name)
            .ok_or_else(|| {
                CoreError::setup(
                    "bootstrap",
                    format!(
                        "Unknown bootstrap phase [{name}]. Valid phases are: {:?}.",
                        Self::names()
                    ),
                )
            })
    }
}
