//! Droplet endpoints

use gantry_core::domain::instance::Instance;
use gantry_core::dto::instance::CreateInstance;
use reqwest::Method;
use serde::Deserialize;

use super::DigitalOceanClient;
use crate::error::Result;
use crate::{Page, handle_empty_response, handle_response};

const PER_PAGE: usize = 200;

#[derive(Deserialize)]
struct DropletEnvelope {
    droplet: Instance,
}

#[derive(Deserialize)]
struct DropletsPage {
    droplets: Vec<Instance>,
}

impl Page for DropletsPage {
    type Item = Instance;

    fn into_items(self) -> Vec<Instance> {
        self.droplets
    }
}

impl DigitalOceanClient {
    // =============================================================================
    // Droplet Lifecycle
    // =============================================================================

    /// Create a droplet
    ///
    /// # Returns
    /// The droplet as first reported, normally with status `new`
    pub async fn create_droplet(&self, req: &CreateInstance) -> Result<Instance> {
        let response = self
            .request(Method::POST, "/droplets")
            .json(req)
            .send()
            .await?;

        let envelope: DropletEnvelope = handle_response(response).await?;
        Ok(envelope.droplet)
    }

    /// Get a droplet by id
    pub async fn get_droplet(&self, droplet_id: u64) -> Result<Instance> {
        let response = self
            .request(Method::GET, &format!("/droplets/{}", droplet_id))
            .send()
            .await?;

        let envelope: DropletEnvelope = handle_response(response).await?;
        Ok(envelope.droplet)
    }

    /// Delete a droplet
    pub async fn delete_droplet(&self, droplet_id: u64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/droplets/{}", droplet_id))
            .send()
            .await?;

        handle_empty_response(response).await
    }

    // =============================================================================
    // Droplet Query
    // =============================================================================

    /// List every droplet carrying a tag
    pub async fn list_droplets_by_tag(&self, tag: &str) -> Result<Vec<Instance>> {
        let mut droplets = Vec::new();

        for page in 1usize.. {
            let response = self
                .request(Method::GET, "/droplets")
                .query(&[("tag_name", tag)])
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;

            let batch = handle_response::<DropletsPage>(response).await?.into_items();
            let count = batch.len();
            droplets.extend(batch);

            if count < PER_PAGE {
                break;
            }
        }

        Ok(droplets)
    }
}
