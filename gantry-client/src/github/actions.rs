//! Actions endpoints
//!
//! Workflow runs and definitions, self-hosted runner registration and the
//! runner agent's releases.

use gantry_core::domain::check_run::JobStatus;
use gantry_core::domain::release::RunnerRelease;
use gantry_core::domain::workflow::{Workflow, WorkflowRun};
use gantry_core::dto::runner::RegistrationToken;
use reqwest::Method;
use serde::Deserialize;

use super::GitHubClient;
use crate::error::{ClientError, Result};
use crate::{Page, handle_response};

/// Repository publishing the runner agent
const RUNNER_REPOSITORY: &str = "actions/runner";

#[derive(Deserialize)]
struct WorkflowRunsPage {
    workflow_runs: Vec<WorkflowRun>,
}

impl Page for WorkflowRunsPage {
    type Item = WorkflowRun;

    fn into_items(self) -> Vec<WorkflowRun> {
        self.workflow_runs
    }
}

impl GitHubClient {
    // =============================================================================
    // Workflows
    // =============================================================================

    /// List the workflow runs of a repository in a given status
    ///
    /// # Arguments
    /// * `repo` - Repository full name (`owner/name`)
    /// * `status` - Only runs in this status are returned
    pub async fn list_workflow_runs(&self, repo: &str, status: JobStatus) -> Result<Vec<WorkflowRun>> {
        self.get_all::<WorkflowRunsPage>(
            &format!("/repos/{}/actions/runs", repo),
            &[("status", status.as_str())],
        )
        .await
    }

    /// Get a workflow's metadata
    pub async fn get_workflow(&self, repo: &str, workflow_id: u64) -> Result<Workflow> {
        let response = self
            .request(
                Method::GET,
                &format!("/repos/{}/actions/workflows/{}", repo, workflow_id),
            )
            .send()
            .await?;

        handle_response(response).await
    }

    // =============================================================================
    // Self-hosted Runners
    // =============================================================================

    /// Create a one-time registration token for an organization runner
    ///
    /// # Arguments
    /// * `org` - Organization login
    pub async fn create_registration_token(&self, org: &str) -> Result<RegistrationToken> {
        let response = self
            .request(
                Method::POST,
                &format!("/orgs/{}/actions/runners/registration-token", org),
            )
            .send()
            .await?;

        handle_response(response).await
    }

    /// Get the latest release of the runner agent
    pub async fn latest_runner_release(&self) -> Result<RunnerRelease> {
        let response = self
            .request(
                Method::GET,
                &format!("/repos/{}/releases/latest", RUNNER_REPOSITORY),
            )
            .send()
            .await?;

        handle_response(response).await
    }

    /// Download URL of the latest Linux x64 runner agent tarball
    ///
    /// # Returns
    /// The asset's browser download URL, or `ClientError::NotFound` when the
    /// latest release has no `actions-runner-linux-x64-<version>.tar.gz` asset
    pub async fn runner_download_url(&self) -> Result<String> {
        let release = self.latest_runner_release().await?;

        release
            .linux_x64_download_url()
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "runner asset {} in release {}",
                    release.linux_x64_asset_name(),
                    release.tag_name
                ))
            })
    }
}
