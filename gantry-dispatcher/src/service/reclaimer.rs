//! Reclaimer
//!
//! Destroys every droplet this deployment may have left running. Runs
//! before the deploy loop starts and again once it has stopped, when no
//! worker can still own a droplet.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::INSTANCE_NAME_PREFIX;
use crate::repository::ComputeRepository;

/// Sweeps tagged runner droplets
pub struct Reclaimer {
    compute: Arc<dyn ComputeRepository>,
    tag: String,
}

impl Reclaimer {
    /// Creates a new reclaimer
    ///
    /// # Arguments
    /// * `compute` - Compute provider access
    /// * `tag` - Deployment tag; only droplets carrying it are considered
    pub fn new(compute: Arc<dyn ComputeRepository>, tag: String) -> Self {
        Self { compute, tag }
    }

    /// Destroys every droplet tagged with the deployment tag whose name
    /// carries the runner prefix
    ///
    /// A droplet that fails to destroy is logged and skipped.
    ///
    /// # Returns
    /// The number of droplets destroyed
    pub async fn sweep(&self) -> Result<usize> {
        info!("Cleaning up running droplets tagged {}...", self.tag);

        let instances = self.compute.list_instances_by_tag(&self.tag).await?;
        let mut destroyed = 0;

        for instance in instances {
            if !instance.name.starts_with(INSTANCE_NAME_PREFIX) {
                warn!(
                    "Droplet {} ({}) is tagged {} but is not a runner, leaving it",
                    instance.id, instance.name, self.tag
                );
                continue;
            }

            info!("Destroying droplet {} ({})...", instance.id, instance.name);
            match self.compute.destroy_instance(instance.id).await {
                Ok(()) => destroyed += 1,
                Err(e) => error!("Failed to destroy droplet {}: {:#}", instance.id, e),
            }
        }

        Ok(destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCompute;

    #[tokio::test]
    async fn test_sweep_only_destroys_runner_droplets() {
        let compute = Arc::new(
            FakeCompute::new()
                .with_instance(1, "gh-runner-123", "gantry-test")
                .with_instance(2, "database", "gantry-test")
                .with_instance(3, "gh-runner-456", "gantry-test")
                .with_instance(4, "gh-runner-789", "other-tag"),
        );

        let destroyed = Reclaimer::new(compute.clone(), "gantry-test".to_string())
            .sweep()
            .await
            .unwrap();

        assert_eq!(destroyed, 2);
        let mut ids = compute.destroyed();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_to_reclaim() {
        let compute = Arc::new(FakeCompute::new());

        let destroyed = Reclaimer::new(compute.clone(), "gantry-test".to_string())
            .sweep()
            .await
            .unwrap();

        assert_eq!(destroyed, 0);
        assert!(compute.destroyed().is_empty());
    }
}
