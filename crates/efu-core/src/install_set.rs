//! A/B install sets for redundant layouts

use serde::{Deserialize, Serialize};

use crate::error::EfuError;

/// Install set an object belongs to in an active/backup layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSet {
    /// First install set
    A,
    /// Second install set
    B,
}

impl InstallSet {
    /// Both sets in metadata order
    pub const ALL: [InstallSet; 2] = [InstallSet::A, InstallSet::B];
}

impl std::fmt::Display for InstallSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallSet::A => write!(f, "a"),
            InstallSet::B => write!(f, "b"),
        }
    }
}

impl std::str::FromStr for InstallSet {
    type Err = EfuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(InstallSet::A),
            "b" | "B" => Ok(InstallSet::B),
            other => Err(EfuError::invalid_option(
                "install-set",
                format!("'{other}' is not one of: a, b"),
            )),
        }
    }
}
