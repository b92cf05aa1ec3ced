//! Compute repository
//!
//! Handles communication with DigitalOcean for the droplet lifecycle:
//! - Creating a droplet for one job
//! - Observing its power state
//! - Listing and destroying tagged droplets

use anyhow::{Context, Result};
use async_trait::async_trait;
use gantry_client::DigitalOceanClient;
use gantry_core::domain::instance::Instance;
use gantry_core::dto::instance::CreateInstance;

/// Repository trait for compute provider operations
#[async_trait]
pub trait ComputeRepository: Send + Sync {
    /// Creates an instance
    async fn create_instance(&self, req: CreateInstance) -> Result<Instance>;

    /// Fetches an instance's current state
    async fn get_instance(&self, instance_id: u64) -> Result<Instance>;

    /// Lists every instance carrying `tag`
    async fn list_instances_by_tag(&self, tag: &str) -> Result<Vec<Instance>>;

    /// Destroys an instance
    async fn destroy_instance(&self, instance_id: u64) -> Result<()>;
}

/// HTTP implementation of ComputeRepository
pub struct HttpComputeRepository {
    client: DigitalOceanClient,
}

impl HttpComputeRepository {
    /// Creates a new HTTP compute repository
    pub fn new(client: DigitalOceanClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ComputeRepository for HttpComputeRepository {
    async fn create_instance(&self, req: CreateInstance) -> Result<Instance> {
        self.client
            .create_droplet(&req)
            .await
            .with_context(|| format!("Failed to create droplet {}", req.name))
    }

    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        self.client
            .get_droplet(instance_id)
            .await
            .with_context(|| format!("Failed to fetch droplet {}", instance_id))
    }

    async fn list_instances_by_tag(&self, tag: &str) -> Result<Vec<Instance>> {
        self.client
            .list_droplets_by_tag(tag)
            .await
            .with_context(|| format!("Failed to list droplets tagged {}", tag))
    }

    async fn destroy_instance(&self, instance_id: u64) -> Result<()> {
        self.client
            .delete_droplet(instance_id)
            .await
            .with_context(|| format!("Failed to destroy droplet {}", instance_id))
    }
}
