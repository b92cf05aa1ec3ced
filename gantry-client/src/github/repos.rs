//! Repository endpoints

use gantry_core::domain::repository::Repository;
use reqwest::Method;

use super::{GitHubClient, RAW_MEDIA_TYPE};
use crate::error::Result;
use crate::handle_text_response;

impl GitHubClient {
    /// List every repository of an organization
    ///
    /// # Arguments
    /// * `org` - Organization login
    pub async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        self.get_all::<Vec<Repository>>(&format!("/orgs/{}/repos", org), &[])
            .await
    }

    /// Fetch a file's content at a git ref through the contents API
    ///
    /// Authenticated, so it also reads private repositories.
    ///
    /// # Arguments
    /// * `repo` - Repository full name (`owner/name`)
    /// * `path` - File path inside the repository
    /// * `git_ref` - Commit SHA, branch or tag
    pub async fn get_file_contents(&self, repo: &str, path: &str, git_ref: &str) -> Result<String> {
        let response = self
            .request_as(
                Method::GET,
                &format!("/repos/{}/contents/{}", repo, path),
                RAW_MEDIA_TYPE,
            )
            .query(&[("ref", git_ref)])
            .send()
            .await?;

        handle_text_response(response).await
    }
}
