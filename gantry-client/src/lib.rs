//! Gantry HTTP Clients
//!
//! Typed HTTP clients for the two providers the dispatcher talks to:
//! GitHub (queued jobs, workflow sources, runner registration) and
//! DigitalOcean (droplet lifecycle).
//!
//! # Example
//!
//! ```no_run
//! use gantry_client::{DigitalOceanClient, GitHubClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let github = GitHubClient::new("https://api.github.com", "ghp_token");
//!     let repos = github.list_org_repositories("acme").await?;
//!     println!("acme has {} repositories", repos.len());
//!
//!     let digitalocean = DigitalOceanClient::new("https://api.digitalocean.com/v2", "do_token");
//!     let droplets = digitalocean.list_droplets_by_tag("gh-runners").await?;
//!     println!("{} tagged droplets", droplets.len());
//!     Ok(())
//! }
//! ```

mod digitalocean;
pub mod error;
mod github;
#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use digitalocean::DigitalOceanClient;
pub use error::{ClientError, Result};
pub use github::GitHubClient;

use serde::de::DeserializeOwned;

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response that returns no content (e.g., DELETE operations)
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

/// Handle an API response whose body is plain text
pub(crate) async fn handle_text_response(response: reqwest::Response) -> Result<String> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response.text().await?)
}

/// One page of a paginated list endpoint
pub(crate) trait Page: DeserializeOwned {
    type Item;

    fn into_items(self) -> Vec<Self::Item>;
}

impl<T: DeserializeOwned> Page for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}
