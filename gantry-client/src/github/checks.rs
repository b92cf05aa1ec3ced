//! Check suite and check-run endpoints

use gantry_core::domain::check_run::{CheckRun, JobStatus};
use serde::Deserialize;

use super::GitHubClient;
use crate::error::Result;
use crate::{Page, handle_response};

#[derive(Deserialize)]
struct CheckRunsPage {
    check_runs: Vec<CheckRun>,
}

impl Page for CheckRunsPage {
    type Item = CheckRun;

    fn into_items(self) -> Vec<CheckRun> {
        self.check_runs
    }
}

impl GitHubClient {
    /// List the check-runs of a check suite in a given status
    ///
    /// # Arguments
    /// * `repo` - Repository full name (`owner/name`)
    /// * `check_suite_id` - The check suite id
    /// * `status` - Only check-runs in this status are returned
    pub async fn list_check_runs(
        &self,
        repo: &str,
        check_suite_id: u64,
        status: JobStatus,
    ) -> Result<Vec<CheckRun>> {
        self.get_all::<CheckRunsPage>(
            &format!("/repos/{}/check-suites/{}/check-runs", repo, check_suite_id),
            &[("status", status.as_str())],
        )
        .await
    }

    /// Get a single check-run, e.g. to observe its current status
    pub async fn get_check_run(&self, repo: &str, check_run_id: u64) -> Result<CheckRun> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{}/check-runs/{}", repo, check_run_id),
            )
            .send()
            .await?;

        handle_response(response).await
    }
}
