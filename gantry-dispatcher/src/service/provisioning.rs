//! Provisioning worker
//!
//! Runs one matched job to completion on its own droplet:
//! 1. Wait the pickup delay and re-check that the job is still queued
//! 2. Create a droplet whose boot script registers an ephemeral runner
//! 3. Poll until the droplet has powered itself off
//! 4. Destroy the droplet
//!
//! Errors are not retried here. They propagate to the deploy loop's
//! supervisor, and a droplet left behind is removed by the reclaimer.

use anyhow::{Context, Result};
use gantry_core::domain::check_run::{CheckRun, JobStatus};
use gantry_core::domain::repository::Repository;
use gantry_core::dto::instance::CreateInstance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, INSTANCE_NAME_PREFIX};
use crate::repository::{CiRepository, ComputeRepository};
use crate::service::boot_script::{BootScript, BootScriptParams};

/// A queued check-run the deploy loop decided to serve
#[derive(Debug, Clone)]
pub struct MatchedJob {
    pub repo: Repository,
    pub run_id: u64,
    pub check_run: CheckRun,
    /// One-time runner registration token
    pub registration_token: String,
    /// Runner agent tarball
    pub runner_download_url: String,
}

/// How a worker finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The job left the queue during the pickup delay; nothing was provisioned
    Skipped { status: JobStatus },

    /// The droplet ran the job, powered off and was destroyed
    Completed { instance_id: u64 },
}

/// Droplet name for a job
///
/// Seeded by the job id, so every attempt for the same job yields the same
/// name.
pub fn instance_name(job_id: u64) -> String {
    let mut rng = StdRng::seed_from_u64(job_id);
    format!("{}{}", INSTANCE_NAME_PREFIX, rng.gen_range(0..=10_000_000u32))
}

/// Provisions and reclaims the droplet of one job
pub struct ProvisioningWorker {
    ci: Arc<dyn CiRepository>,
    compute: Arc<dyn ComputeRepository>,
    config: Arc<Config>,
    boot_script: Arc<BootScript>,
}

impl ProvisioningWorker {
    /// Creates a new provisioning worker
    ///
    /// # Arguments
    /// * `ci` - Re-checks job status
    /// * `compute` - Creates, polls and destroys droplets
    /// * `config` - Droplet shape, labels and intervals
    /// * `boot_script` - Renders each droplet's user data
    pub fn new(
        ci: Arc<dyn CiRepository>,
        compute: Arc<dyn ComputeRepository>,
        config: Arc<Config>,
        boot_script: Arc<BootScript>,
    ) -> Self {
        Self {
            ci,
            compute,
            config,
            boot_script,
        }
    }

    /// Runs `job` until its droplet is destroyed
    pub async fn run(&self, job: MatchedJob) -> Result<WorkerOutcome> {
        let job_id = job.check_run.id;
        let name = instance_name(job_id);

        tokio::time::sleep(self.config.pickup_delay).await;

        // Another runner may have claimed it, or it was cancelled
        let current = self.ci.get_check_run(&job.repo, job_id).await?;
        if current.status != JobStatus::Queued {
            debug!(
                "[{}] Job is {} after pickup delay, not provisioning",
                job_id, current.status
            );
            return Ok(WorkerOutcome::Skipped {
                status: current.status,
            });
        }

        info!(
            "[{}] Picking up job '{}' for {} run {}...",
            job_id, current.name, job.repo.full_name, job.run_id
        );

        let user_data = self
            .boot_script
            .render(&BootScriptParams {
                labels: self.config.labels.as_slice(),
                registration_token: &job.registration_token,
                org_name: &self.config.org_name,
                runner_download_url: &job.runner_download_url,
                runner_name: &name,
            })
            .with_context(|| format!("Failed to build boot script for job {}", job_id))?;

        let instance = self
            .compute
            .create_instance(CreateInstance {
                name: name.clone(),
                region: self.config.region.clone(),
                size: self.config.size.clone(),
                image: self.config.image.clone(),
                user_data,
                tags: vec![self.config.tag.clone()],
            })
            .await?;

        info!("[{}] Running on {} ({})...", job_id, instance.name, instance.id);

        loop {
            tokio::time::sleep(self.config.status_poll_interval).await;

            let state = self.compute.get_instance(instance.id).await?;
            if state.is_off() {
                break;
            }
            debug!("[{}] {} is {}", job_id, state.name, state.status);
        }

        info!("[{}] Done!", job_id);
        self.compute.destroy_instance(instance.id).await?;

        Ok(WorkerOutcome::Completed {
            instance_id: instance.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::boot_script::MAX_BOOT_SCRIPT_BYTES;
    use crate::testing::{FakeCi, FakeCompute, check_run, matched_job, repository, test_config};

    fn worker(ci: &Arc<FakeCi>, compute: &Arc<FakeCompute>, boot_script: BootScript) -> ProvisioningWorker {
        ProvisioningWorker::new(
            ci.clone(),
            compute.clone(),
            Arc::new(test_config()),
            Arc::new(boot_script),
        )
    }

    #[test]
    fn test_instance_name_is_reproducible() {
        assert_eq!(instance_name(42), instance_name(42));
        assert!(instance_name(42).starts_with("gh-runner-"));
        assert_ne!(instance_name(42), instance_name(43));
    }

    #[tokio::test]
    async fn test_run_provisions_waits_and_destroys() {
        let ci = Arc::new(FakeCi::new().with_status(7, JobStatus::Queued));
        let compute = Arc::new(FakeCompute::new().power_off_after(2));

        let outcome = worker(&ci, &compute, BootScript::default())
            .run(matched_job(repository(1, "acme/app"), check_run(7, "build")))
            .await
            .unwrap();

        let created = compute.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, instance_name(7));
        assert_eq!(created[0].tags, vec!["gantry-test".to_string()]);
        assert!(created[0].user_data.contains("--labels self-hosted,linux"));
        assert!(created[0].user_data.contains(&format!("--name {}", instance_name(7))));

        let instance_id = match outcome {
            WorkerOutcome::Completed { instance_id } => instance_id,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(compute.destroyed(), vec![instance_id]);
        assert!(compute.status_polls(instance_id) >= 2);
    }

    #[tokio::test]
    async fn test_run_skips_job_no_longer_queued() {
        for status in [JobStatus::InProgress, JobStatus::Completed] {
            let ci = Arc::new(FakeCi::new().with_status(7, status));
            let compute = Arc::new(FakeCompute::new());

            let outcome = worker(&ci, &compute, BootScript::default())
                .run(matched_job(repository(1, "acme/app"), check_run(7, "build")))
                .await
                .unwrap();

            assert_eq!(outcome, WorkerOutcome::Skipped { status });
            assert!(compute.created().is_empty());
        }
    }

    #[tokio::test]
    async fn test_run_fails_on_oversized_boot_script() {
        let ci = Arc::new(FakeCi::new().with_status(7, JobStatus::Queued));
        let compute = Arc::new(FakeCompute::new());
        let oversized = BootScript::new(Some("#".repeat(MAX_BOOT_SCRIPT_BYTES)));

        let result = worker(&ci, &compute, oversized)
            .run(matched_job(repository(1, "acme/app"), check_run(7, "build")))
            .await;

        assert!(result.is_err());
        assert!(compute.created().is_empty());
    }

    #[tokio::test]
    async fn test_run_propagates_status_check_failure() {
        // No status registered: the re-fetch fails
        let ci = Arc::new(FakeCi::new());
        let compute = Arc::new(FakeCompute::new());

        let result = worker(&ci, &compute, BootScript::default())
            .run(matched_job(repository(1, "acme/app"), check_run(7, "build")))
            .await;

        assert!(result.is_err());
        assert!(compute.created().is_empty());
    }
}
