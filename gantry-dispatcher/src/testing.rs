//! In-memory repositories and fixtures for tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use gantry_core::domain::check_run::{CheckRun, JobStatus};
use gantry_core::domain::instance::{Instance, InstanceStatus};
use gantry_core::domain::labels::MonitoredLabels;
use gantry_core::domain::repository::Repository;
use gantry_core::domain::workflow::{Workflow, WorkflowRun};
use gantry_core::dto::instance::CreateInstance;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::repository::{CiRepository, ComputeRepository};
use crate::service::MatchedJob;

/// Serves `router` on an ephemeral local port and returns its base URL
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{}", addr)
}

pub fn test_config() -> Config {
    let mut config = Config::new(
        "acme".to_string(),
        MonitoredLabels::parse("self-hosted,linux"),
        Duration::from_millis(1),
    );
    config.github_token = "ghp_test".to_string();
    config.digitalocean_token = "do_test".to_string();
    config.region = "fra1".to_string();
    config.image = "ubuntu-24-04-x64".to_string();
    config.size = "s-1vcpu-1gb".to_string();
    config.tag = "gantry-test".to_string();
    config.poll_interval = Duration::from_millis(5);
    config.status_poll_interval = Duration::from_millis(1);
    config
}

pub fn repository(id: u64, full_name: &str) -> Repository {
    Repository {
        id,
        name: full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
        full_name: full_name.to_string(),
    }
}

pub fn workflow_run(id: u64, workflow_id: u64, check_suite_id: u64) -> WorkflowRun {
    WorkflowRun {
        id,
        workflow_id,
        head_sha: format!("sha{}", id),
        check_suite_id: Some(check_suite_id),
        check_suite_url: None,
    }
}

pub fn check_run(id: u64, name: &str) -> CheckRun {
    CheckRun {
        id,
        name: name.to_string(),
        status: JobStatus::Queued,
    }
}

pub fn matched_job(repo: Repository, check_run: CheckRun) -> MatchedJob {
    MatchedJob {
        repo,
        run_id: 10,
        check_run,
        registration_token: "REGTOKEN".to_string(),
        runner_download_url: "https://example.com/actions-runner.tar.gz".to_string(),
    }
}

/// CI provider backed by maps filled in by the test
#[derive(Default)]
pub struct FakeCi {
    repositories: Vec<Repository>,
    runs: HashMap<u64, Vec<WorkflowRun>>,
    check_runs: HashMap<u64, Vec<CheckRun>>,
    statuses: Mutex<HashMap<u64, JobStatus>>,
    workflows: HashMap<u64, (Workflow, String)>,
    fail_listing: bool,
    listings: AtomicUsize,
    source_fetches: AtomicUsize,
    tokens_issued: AtomicUsize,
}

impl FakeCi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repo: Repository) -> Self {
        self.repositories.push(repo);
        self
    }

    pub fn with_run(mut self, repo_id: u64, run: WorkflowRun) -> Self {
        self.runs.entry(repo_id).or_default().push(run);
        self
    }

    /// Queued check-runs of a suite; each starts out `Queued` on re-fetch
    pub fn with_check_runs(mut self, check_suite_id: u64, check_runs: Vec<CheckRun>) -> Self {
        {
            let statuses = self.statuses.get_mut().unwrap();
            for run in &check_runs {
                statuses.entry(run.id).or_insert(JobStatus::Queued);
            }
        }
        self.check_runs
            .entry(check_suite_id)
            .or_default()
            .extend(check_runs);
        self
    }

    /// Status reported when the check-run is re-fetched
    pub fn with_status(self, check_run_id: u64, status: JobStatus) -> Self {
        self.set_status(check_run_id, status);
        self
    }

    pub fn with_workflow(mut self, workflow_id: u64, source: &str) -> Self {
        let path = format!(".github/workflows/wf{}.yml", workflow_id);
        let workflow = Workflow {
            id: workflow_id,
            name: format!("wf{}", workflow_id),
            html_url: format!("https://github.com/acme/app/blob/main/{}", path),
            path,
        };
        self.workflows
            .insert(workflow_id, (workflow, source.to_string()));
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn set_status(&self, check_run_id: u64, status: JobStatus) {
        self.statuses.lock().unwrap().insert(check_run_id, status);
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn source_fetches(&self) -> usize {
        self.source_fetches.load(Ordering::SeqCst)
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CiRepository for FakeCi {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(anyhow!("502 Bad Gateway"));
        }
        Ok(self.repositories.clone())
    }

    async fn list_queued_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>> {
        Ok(self.runs.get(&repo.id).cloned().unwrap_or_default())
    }

    async fn list_queued_check_runs(
        &self,
        _repo: &Repository,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>> {
        Ok(self
            .check_runs
            .get(&check_suite_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_check_run(&self, _repo: &Repository, check_run_id: u64) -> Result<CheckRun> {
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(&check_run_id)
            .copied()
            .ok_or_else(|| anyhow!("check-run {} not found", check_run_id))?;

        Ok(CheckRun {
            id: check_run_id,
            name: format!("check-run-{}", check_run_id),
            status,
        })
    }

    async fn get_workflow(&self, _repo: &Repository, workflow_id: u64) -> Result<Workflow> {
        self.workflows
            .get(&workflow_id)
            .map(|(workflow, _)| workflow.clone())
            .ok_or_else(|| anyhow!("workflow {} not found", workflow_id))
    }

    async fn fetch_workflow_source(
        &self,
        _repo: &Repository,
        workflow: &Workflow,
        _head_sha: &str,
    ) -> Result<String> {
        self.source_fetches.fetch_add(1, Ordering::SeqCst);
        self.workflows
            .get(&workflow.id)
            .map(|(_, source)| source.clone())
            .ok_or_else(|| anyhow!("404 {}", workflow.path))
    }

    async fn create_registration_token(&self) -> Result<String> {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("REGTOKEN{}", n))
    }

    async fn runner_download_url(&self) -> Result<String> {
        Ok("https://example.com/actions-runner-linux-x64-2.319.1.tar.gz".to_string())
    }
}

/// Compute provider keeping droplets in memory
///
/// Created droplets stay `Active` until powered off explicitly or, with
/// [`FakeCompute::power_off_after`], after a number of status polls.
pub struct FakeCompute {
    instances: Mutex<HashMap<u64, Instance>>,
    created: Mutex<Vec<CreateInstance>>,
    destroyed: Mutex<Vec<u64>>,
    status_polls: Mutex<HashMap<u64, u32>>,
    power_off_after: Option<u32>,
    next_id: AtomicU64,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            status_polls: Mutex::new(HashMap::new()),
            power_off_after: None,
            next_id: AtomicU64::new(1000),
        }
    }

    pub fn power_off_after(mut self, polls: u32) -> Self {
        self.power_off_after = Some(polls);
        self
    }

    /// Pre-existing droplet, e.g. left over by a crashed dispatcher
    pub fn with_instance(self, id: u64, name: &str, tag: &str) -> Self {
        self.instances.lock().unwrap().insert(
            id,
            Instance {
                id,
                name: name.to_string(),
                status: InstanceStatus::Active,
                tags: vec![tag.to_string()],
            },
        );
        self
    }

    /// Simulates the boot script halting the machine
    pub fn power_off(&self, name: &str) {
        for instance in self.instances.lock().unwrap().values_mut() {
            if instance.name == name {
                instance.status = InstanceStatus::Off;
            }
        }
    }

    pub fn created(&self) -> Vec<CreateInstance> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<u64> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn status_polls(&self, instance_id: u64) -> u32 {
        self.status_polls
            .lock()
            .unwrap()
            .get(&instance_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ComputeRepository for FakeCompute {
    async fn create_instance(&self, req: CreateInstance) -> Result<Instance> {
        let instance = Instance {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: req.name.clone(),
            status: InstanceStatus::New,
            tags: req.tags.clone(),
        };
        self.instances
            .lock()
            .unwrap()
            .insert(instance.id, instance.clone());
        self.created.lock().unwrap().push(req);
        Ok(instance)
    }

    async fn get_instance(&self, instance_id: u64) -> Result<Instance> {
        let polls = {
            let mut status_polls = self.status_polls.lock().unwrap();
            let polls = status_polls.entry(instance_id).or_insert(0);
            *polls += 1;
            *polls
        };

        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .get_mut(&instance_id)
            .ok_or_else(|| anyhow!("droplet {} not found", instance_id))?;

        if instance.status != InstanceStatus::Off {
            instance.status = match self.power_off_after {
                Some(after) if polls >= after => InstanceStatus::Off,
                _ => InstanceStatus::Active,
            };
        }

        Ok(instance.clone())
    }

    async fn list_instances_by_tag(&self, tag: &str) -> Result<Vec<Instance>> {
        let mut tagged: Vec<Instance> = self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|instance| instance.tags.iter().any(|t| t == tag))
            .cloned()
            .collect();
        tagged.sort_by_key(|instance| instance.id);
        Ok(tagged)
    }

    async fn destroy_instance(&self, instance_id: u64) -> Result<()> {
        self.instances
            .lock()
            .unwrap()
            .remove(&instance_id)
            .ok_or_else(|| anyhow!("droplet {} not found", instance_id))?;
        self.destroyed.lock().unwrap().push(instance_id);
        Ok(())
    }
}
