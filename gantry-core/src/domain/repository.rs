//! Repository domain type

use serde::{Deserialize, Serialize};

/// A repository owned by the monitored organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    /// `owner/name`, used to build API paths
    pub full_name: String,
}
