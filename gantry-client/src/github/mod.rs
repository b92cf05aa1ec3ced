//! GitHub REST API client

mod actions;
mod checks;
mod repos;

use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;

use crate::error::Result;
use crate::{Page, handle_response, handle_text_response};

const PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const USER_AGENT: &str = concat!("gantry/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the GitHub REST API
///
/// Endpoint groups live in submodules:
/// - Repositories of an organization
/// - Actions (workflow runs, workflows, runner registration, runner releases)
/// - Checks (check suites and check-runs)
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// Access token sent as a bearer credential
    token: String,
    /// HTTP client instance
    client: Client,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// * `base_url` - The API base URL, `https://api.github.com` or a GitHub Enterprise URL
    /// * `token` - A token allowed to read workflows and manage organization runners
    ///
    /// # Example
    /// ```
    /// use gantry_client::GitHubClient;
    ///
    /// let client = GitHubClient::new("https://api.github.com/", "ghp_token");
    /// assert_eq!(client.base_url(), "https://api.github.com");
    /// ```
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(base_url, token, Client::new())
    }

    /// Create a new GitHub client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a plain text document, e.g. a workflow file's raw source
    ///
    /// The URL is used as-is and no credentials are attached.
    pub async fn get_raw_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        handle_text_response(response).await
    }

    /// Build an authenticated request against an API path
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_as(method, path, JSON_MEDIA_TYPE)
    }

    fn request_as(&self, method: Method, path: &str, media_type: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, media_type)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// GET every page of a list endpoint
    ///
    /// Stops at the first page holding fewer than `PER_PAGE` items.
    async fn get_all<P: Page>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();

        for page in 1usize.. {
            let response = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;

            let batch = handle_response::<P>(response).await?.into_items();
            let count = batch.len();
            items.extend(batch);

            if count < PER_PAGE {
                break;
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_client_creation() {
        let client = GitHubClient::new("https://api.github.com", "token");
        assert_eq!(client.base_url(), "https://api.github.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GitHubClient::new("https://github.example.com/api/v3/", "token");
        assert_eq!(client.base_url(), "https://github.example.com/api/v3");
    }

    #[tokio::test]
    async fn test_get_all_follows_pages_until_a_short_one() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let seen = requested.clone();
        let router = Router::new().route(
            "/orgs/acme/repos",
            get(move |Query(query): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    let page: u64 = query["page"].parse().unwrap();
                    seen.lock().unwrap().push((page, query["per_page"].clone()));

                    let start = (page - 1) * 100;
                    let count = if page == 1 { 100 } else { 3 };
                    let repos: Vec<Value> = (start..start + count)
                        .map(|id| {
                            json!({"id": id, "name": format!("r{}", id), "full_name": format!("acme/r{}", id)})
                        })
                        .collect();
                    Json(repos)
                }
            }),
        );

        let client = GitHubClient::new(serve(router).await, "ghp_test");
        let repos = client.list_org_repositories("acme").await.unwrap();

        assert_eq!(repos.len(), 103);
        assert_eq!(repos[102].full_name, "acme/r102");
        assert_eq!(
            *requested.lock().unwrap(),
            vec![(1, "100".to_string()), (2, "100".to_string())]
        );
    }

    #[tokio::test]
    async fn test_get_file_contents_is_authenticated_and_raw() {
        let router = Router::new().route(
            "/repos/acme/app/contents/{*path}",
            get(
                |Path(path): Path<String>,
                 Query(query): Query<HashMap<String, String>>,
                 headers: HeaderMap| async move {
                    let header_is = |name: header::HeaderName, expected: &str| {
                        headers.get(name).and_then(|v| v.to_str().ok()) == Some(expected)
                    };
                    if !header_is(header::AUTHORIZATION, "Bearer ghp_test")
                        || !header_is(header::ACCEPT, "application/vnd.github.raw+json")
                    {
                        return (StatusCode::UNAUTHORIZED, String::new());
                    }
                    (StatusCode::OK, format!("{}@{}", path, query["ref"]))
                },
            ),
        );

        let client = GitHubClient::new(serve(router).await, "ghp_test");
        let content = client
            .get_file_contents("acme/app", ".github/workflows/ci.yml", "abc123")
            .await
            .unwrap();

        assert!(content.ends_with(".github/workflows/ci.yml@abc123"));
    }

    #[tokio::test]
    async fn test_raw_text_not_found() {
        let client = GitHubClient::new(serve(Router::new()).await, "ghp_test");
        let url = format!("{}/acme/app/raw/abc123/ci.yml", client.base_url());

        assert!(client.get_raw_text(&url).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = GitHubClient::with_client("https://api.github.com", "token", Client::new());
        assert_eq!(client.base_url(), "https://api.github.com");
    }
}
