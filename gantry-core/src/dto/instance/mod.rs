//! Instance DTOs

use serde::{Deserialize, Serialize};

/// Request to create one compute instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstance {
    pub name: String,
    pub region: String,
    /// Size class slug, e.g. `s-2vcpu-4gb`
    pub size: String,
    pub image: String,
    /// Boot-time configuration script
    pub user_data: String,
    pub tags: Vec<String>,
}
