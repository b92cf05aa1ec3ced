//! DigitalOcean REST API client

mod droplets;

use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;

/// HTTP client for the DigitalOcean API
#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    /// Base URL of the API (e.g., "https://api.digitalocean.com/v2")
    base_url: String,
    /// Personal access token sent as a bearer credential
    token: String,
    /// HTTP client instance
    client: Client,
}

impl DigitalOceanClient {
    /// Create a new DigitalOcean client
    ///
    /// # Arguments
    /// * `base_url` - The API base URL, normally `https://api.digitalocean.com/v2`
    /// * `token` - A token with droplet read/write scope
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(base_url, token, Client::new())
    }

    /// Create a new DigitalOcean client with a custom HTTP client
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

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.client.request(method, url).bearer_auth(&self.token)
    }
}
