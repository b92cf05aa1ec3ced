//! Deploy loop
//!
//! Polls the organization for queued check-runs and hands each one this
//! deployment should serve to a provisioning worker. Workers run as
//! independent tasks in a `JoinSet`; the loop never waits for them and
//! reaps their results while it sleeps between passes.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::CiRepository;
use crate::service::{
    MatchedJob, PickupTracker, ProvisioningWorker, RunScope, TagResolver, WorkerOutcome,
    instance_name,
};

type WorkerResult = (u64, Result<WorkerOutcome>);

/// Top-level dispatch loop
pub struct DeployLoop {
    config: Arc<Config>,
    ci: Arc<dyn CiRepository>,
    resolver: Arc<dyn TagResolver>,
    worker: Arc<ProvisioningWorker>,
    tracker: PickupTracker,
    workers: JoinSet<WorkerResult>,
}

impl DeployLoop {
    /// Creates a new deploy loop
    pub fn new(
        config: Arc<Config>,
        ci: Arc<dyn CiRepository>,
        resolver: Arc<dyn TagResolver>,
        worker: Arc<ProvisioningWorker>,
    ) -> Self {
        Self {
            config,
            ci,
            resolver,
            worker,
            tracker: PickupTracker::new(),
            workers: JoinSet::new(),
        }
    }

    /// Runs until `shutdown` is cancelled
    ///
    /// A failed pass is logged and retried after the poll interval. On
    /// shutdown every in-flight worker is aborted and awaited before this
    /// returns, so no worker is still creating droplets afterwards.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Running! Serving labels [{}] for {} (poll interval: {:?})",
            self.config.labels, self.config.org_name, self.config.poll_interval
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.poll_once() => match result {
                    Ok(dispatched) => {
                        if dispatched > 0 {
                            info!("Dispatched {} job(s) this cycle", dispatched);
                        }
                    }
                    Err(e) => {
                        error!("Unexpected error in loop: {:#}", e);
                    }
                },
            }

            if !self.wait(self.config.poll_interval, &shutdown).await {
                break;
            }

            let expired = self
                .tracker
                .sweep(Utc::now(), self.config.pickup_expiry());
            if expired > 0 {
                debug!("Expired {} pending pickup(s)", expired);
            }
        }

        self.shutdown_workers().await;
        Ok(())
    }

    /// Performs a single enumeration pass
    ///
    /// # Returns
    /// The number of workers spawned
    pub async fn poll_once(&mut self) -> Result<usize> {
        let mut dispatched = 0;
        let mut download_url: Option<String> = None;

        for repo in self.ci.list_repositories().await? {
            for run in self.ci.list_queued_runs(&repo).await? {
                let Some(check_suite_id) = run.check_suite_id() else {
                    warn!("Run {} of {} has no check suite", run.id, repo.full_name);
                    continue;
                };

                let check_runs = self
                    .ci
                    .list_queued_check_runs(&repo, check_suite_id)
                    .await?;
                let run_id = run.id;
                let mut scope = RunScope::new(repo.clone(), run);

                for check_run in check_runs {
                    if self.tracker.already_tracking(check_run.id) {
                        continue;
                    }

                    let Some(labels) = self.resolver.resolve(&mut scope, &check_run).await else {
                        continue;
                    };

                    if !self.config.labels.intersects(&labels) {
                        debug!(
                            "[{}] '{}' runs on {:?}, not ours",
                            check_run.id, check_run.name, labels
                        );
                        continue;
                    }

                    let registration_token = self.ci.create_registration_token().await?;
                    let runner_download_url = match &download_url {
                        Some(url) => url.clone(),
                        None => {
                            let url = self.ci.runner_download_url().await?;
                            download_url = Some(url.clone());
                            url
                        }
                    };

                    self.dispatch(MatchedJob {
                        repo: repo.clone(),
                        run_id,
                        check_run,
                        registration_token,
                        runner_download_url,
                    });
                    dispatched += 1;
                }
            }
        }

        Ok(dispatched)
    }

    /// Records the job and spawns its worker
    ///
    /// Synchronous, so no other pass can observe the job between the record
    /// and the spawn.
    fn dispatch(&mut self, job: MatchedJob) {
        let job_id = job.check_run.id;
        self.tracker.record(job_id, Utc::now());

        info!(
            "[{}] Matched '{}' in {}, spawning worker for {}",
            job_id,
            job.check_run.name,
            job.repo.full_name,
            instance_name(job_id)
        );

        let worker = Arc::clone(&self.worker);
        self.workers
            .spawn(async move { (job_id, worker.run(job).await) });
    }

    /// Sleeps for `period`, reaping workers as they finish
    ///
    /// # Returns
    /// `false` if `shutdown` was cancelled first
    async fn wait(&mut self, period: Duration, shutdown: &CancellationToken) -> bool {
        let deadline = tokio::time::sleep(period);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return false,
                _ = &mut deadline => return true,
                Some(joined) = self.workers.join_next() => report(joined),
            }
        }
    }

    async fn shutdown_workers(&mut self) {
        if !self.workers.is_empty() {
            info!("Aborting {} in-flight worker(s)", self.workers.len());
        }
        self.workers.shutdown().await;
    }
}

/// Logs a finished worker
fn report(joined: std::result::Result<WorkerResult, JoinError>) {
    match joined {
        Ok((job_id, Ok(WorkerOutcome::Completed { instance_id }))) => {
            info!("[{}] Droplet {} finished and was destroyed", job_id, instance_id);
        }
        Ok((job_id, Ok(WorkerOutcome::Skipped { status }))) => {
            info!("[{}] Job was {} at pickup, skipped", job_id, status);
        }
        Ok((job_id, Err(e))) => {
            error!(
                "[{}] Provisioning failed, any droplet left is reclaimed on restart: {:#}",
                job_id, e
            );
        }
        Err(e) if e.is_panic() => {
            error!("Worker task panicked: {}", e);
        }
        Err(e) => {
            debug!("Worker task cancelled: {}", e);
        }
    }
}
