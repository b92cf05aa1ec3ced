//! Compute instance domain model
//!
//! Represents one ephemeral droplet provisioned to run exactly one job.

use serde::{Deserialize, Serialize};

/// A provisioned compute instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Provider-assigned identifier
    pub id: u64,

    /// Generated name, `gh-runner-<n>` for instances Gantry owns
    pub name: String,

    /// Current power/lifecycle status
    pub status: InstanceStatus,

    /// Tags attached at creation
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Instance {
    /// Whether the instance has halted itself
    pub fn is_off(&self) -> bool {
        self.status == InstanceStatus::Off
    }
}

/// Status of a compute instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Being created
    New,

    /// Booted and running
    Active,

    /// Powered off; the boot script halts the machine after its one job
    Off,

    /// Archived by the provider
    Archive,

    #[serde(other)]
    Other,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::New => write!(f, "new"),
            InstanceStatus::Active => write!(f, "active"),
            InstanceStatus::Off => write!(f, "off"),
            InstanceStatus::Archive => write!(f, "archive"),
            InstanceStatus::Other => write!(f, "other"),
        }
    }
}
