//! CI repository
//!
//! Handles communication with GitHub for everything the deploy loop and
//! the provisioning workers read or request:
//! - Enumerating repositories, queued workflow runs and queued check-runs
//! - Fetching workflow sources at a commit
//! - Issuing runner registration tokens and locating the runner agent

use anyhow::{Context, Result};
use async_trait::async_trait;
use gantry_client::GitHubClient;
use gantry_core::domain::check_run::{CheckRun, JobStatus};
use gantry_core::domain::repository::Repository;
use gantry_core::domain::workflow::{Workflow, WorkflowRun};
use tracing::debug;

/// Repository trait for CI provider operations
#[async_trait]
pub trait CiRepository: Send + Sync {
    /// Lists every repository of the monitored organization
    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// Lists the queued workflow runs of a repository
    async fn list_queued_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>>;

    /// Lists the queued check-runs of a check suite
    async fn list_queued_check_runs(
        &self,
        repo: &Repository,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>>;

    /// Re-fetches a check-run to observe its current status
    async fn get_check_run(&self, repo: &Repository, check_run_id: u64) -> Result<CheckRun>;

    /// Fetches a workflow's metadata
    async fn get_workflow(&self, repo: &Repository, workflow_id: u64) -> Result<Workflow>;

    /// Fetches a workflow's source at a commit
    async fn fetch_workflow_source(
        &self,
        repo: &Repository,
        workflow: &Workflow,
        head_sha: &str,
    ) -> Result<String>;

    /// Issues a one-time organization runner registration token
    async fn create_registration_token(&self) -> Result<String>;

    /// Locates the runner agent tarball to install on new instances
    async fn runner_download_url(&self) -> Result<String>;
}

/// HTTP implementation of CiRepository
pub struct HttpCiRepository {
    client: GitHubClient,
    org_name: String,
}

impl HttpCiRepository {
    /// Creates a new HTTP CI repository
    ///
    /// # Arguments
    /// * `client` - GitHub API client
    /// * `org_name` - Organization login the dispatcher serves
    pub fn new(client: GitHubClient, org_name: String) -> Self {
        Self { client, org_name }
    }
}

#[async_trait]
impl CiRepository for HttpCiRepository {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.client
            .list_org_repositories(&self.org_name)
            .await
            .with_context(|| format!("Failed to list repositories of {}", self.org_name))
    }

    async fn list_queued_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>> {
        self.client
            .list_workflow_runs(&repo.full_name, JobStatus::Queued)
            .await
            .with_context(|| format!("Failed to list queued runs of {}", repo.full_name))
    }

    async fn list_queued_check_runs(
        &self,
        repo: &Repository,
        check_suite_id: u64,
    ) -> Result<Vec<CheckRun>> {
        self.client
            .list_check_runs(&repo.full_name, check_suite_id, JobStatus::Queued)
            .await
            .with_context(|| {
                format!(
                    "Failed to list queued check-runs of {} suite {}",
                    repo.full_name, check_suite_id
                )
            })
    }

    async fn get_check_run(&self, repo: &Repository, check_run_id: u64) -> Result<CheckRun> {
        self.client
            .get_check_run(&repo.full_name, check_run_id)
            .await
            .with_context(|| format!("Failed to fetch check-run {}", check_run_id))
    }

    async fn get_workflow(&self, repo: &Repository, workflow_id: u64) -> Result<Workflow> {
        self.client
            .get_workflow(&repo.full_name, workflow_id)
            .await
            .with_context(|| {
                format!("Failed to fetch workflow {} of {}", workflow_id, repo.full_name)
            })
    }

    /// Reads the raw URL first; private repositories answer 404 there and
    /// are read through the authenticated contents API instead.
    async fn fetch_workflow_source(
        &self,
        repo: &Repository,
        workflow: &Workflow,
        head_sha: &str,
    ) -> Result<String> {
        let url = workflow
            .raw_source_url(head_sha)
            .with_context(|| format!("Unrecognized workflow URL {}", workflow.html_url))?;

        match self.client.get_raw_text(&url).await {
            Err(e) if e.is_not_found() => {
                debug!("{} not found, reading {} through the contents API", url, workflow.path);
                self.client
                    .get_file_contents(&repo.full_name, &workflow.path, head_sha)
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to read {} of {} at {}",
                            workflow.path, repo.full_name, head_sha
                        )
                    })
            }
            result => result.with_context(|| format!("Failed to download workflow source {}", url)),
        }
    }

    async fn create_registration_token(&self) -> Result<String> {
        let token = self
            .client
            .create_registration_token(&self.org_name)
            .await
            .context("Failed to create runner registration token")?;

        Ok(token.token)
    }

    async fn runner_download_url(&self) -> Result<String> {
        self.client
            .runner_download_url()
            .await
            .context("Failed to locate runner agent download")
    }
}
