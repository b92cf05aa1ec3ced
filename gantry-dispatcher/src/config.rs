//! Dispatcher configuration
//!
//! Defines every configurable parameter of the dispatcher: provider
//! credentials, the labels this deployment serves, droplet shape and the
//! polling intervals of the deploy loop and provisioning workers.

use anyhow::Context;
use gantry_core::domain::labels::MonitoredLabels;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of every droplet name the dispatcher generates
///
/// The reclaimer only destroys tagged droplets carrying this prefix.
pub const INSTANCE_NAME_PREFIX: &str = "gh-runner-";

/// Margin added to the pickup delay before a tracked job may be matched again
pub const PICKUP_SAFETY_MARGIN: Duration = Duration::from_secs(8 * 60);

/// Dispatcher configuration
///
/// Built once at startup and shared read-only by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub token (organization runner admin, workflow read)
    pub github_token: String,

    /// GitHub API base URL
    pub github_api_url: String,

    /// Organization whose repositories are watched
    pub org_name: String,

    /// Labels this deployment serves
    pub labels: MonitoredLabels,

    /// How long a worker waits before re-checking and provisioning a job
    pub pickup_delay: Duration,

    /// Pause between two enumeration passes
    pub poll_interval: Duration,

    /// Pause between two power-state checks of a provisioned droplet
    pub status_poll_interval: Duration,

    /// DigitalOcean token
    pub digitalocean_token: String,

    /// DigitalOcean API base URL
    pub digitalocean_api_url: String,

    /// Droplet region slug (e.g., "fra1")
    pub region: String,

    /// Droplet image slug or id (e.g., "ubuntu-24-04-x64")
    pub image: String,

    /// Droplet size slug (e.g., "s-2vcpu-4gb")
    pub size: String,

    /// Tag attached to every droplet this deployment creates
    pub tag: String,

    /// Shell fragment run by the boot script before the runner installs
    pub custom_setup_script: Option<PathBuf>,
}

impl Config {
    /// Creates a configuration with default endpoints and intervals
    pub fn new(org_name: String, labels: MonitoredLabels, pickup_delay: Duration) -> Self {
        Self {
            github_token: String::new(),
            github_api_url: "https://api.github.com".to_string(),
            org_name,
            labels,
            pickup_delay,
            poll_interval: Duration::from_secs(60),
            status_poll_interval: Duration::from_secs(60),
            digitalocean_token: String::new(),
            digitalocean_api_url: "https://api.digitalocean.com/v2".to_string(),
            region: String::new(),
            image: String::new(),
            size: String::new(),
            tag: String::new(),
            custom_setup_script: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - GITHUB_ACCESS_TOKEN (required)
    /// - ORG_NAME (required)
    /// - LABELS (required, comma separated)
    /// - PICKUP_DELAY (required, seconds)
    /// - DIGITALOCEAN_ACCESS_TOKEN (required)
    /// - DIGITALOCEAN_DROPLET_REGION (required)
    /// - DIGITALOCEAN_DROPLET_IMAGE (required)
    /// - DIGITALOCEAN_DROPLET_SIZE (required)
    /// - DIGITALOCEAN_TAG (required)
    /// - CUSTOM_SETUP_SCRIPT (optional, path)
    /// - POLL_INTERVAL (optional, seconds, default: 60)
    /// - STATUS_POLL_INTERVAL (optional, seconds, default: 60)
    /// - GITHUB_API_URL (optional, default: https://api.github.com)
    /// - DIGITALOCEAN_API_URL (optional, default: https://api.digitalocean.com/v2)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
        };

        let seconds = |key: &str, default: Option<u64>| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a number of seconds", key)),
                None => default
                    .map(Duration::from_secs)
                    .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key)),
            }
        };

        let mut config = Self::new(
            required("ORG_NAME")?,
            MonitoredLabels::parse(&required("LABELS")?),
            seconds("PICKUP_DELAY", None)?,
        );

        config.github_token = required("GITHUB_ACCESS_TOKEN")?;
        config.digitalocean_token = required("DIGITALOCEAN_ACCESS_TOKEN")?;
        config.region = required("DIGITALOCEAN_DROPLET_REGION")?;
        config.image = required("DIGITALOCEAN_DROPLET_IMAGE")?;
        config.size = required("DIGITALOCEAN_DROPLET_SIZE")?;
        config.tag = required("DIGITALOCEAN_TAG")?;
        config.custom_setup_script = lookup("CUSTOM_SETUP_SCRIPT")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        config.poll_interval = seconds("POLL_INTERVAL", Some(60))?;
        config.status_poll_interval = seconds("STATUS_POLL_INTERVAL", Some(60))?;

        if let Some(url) = lookup("GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Some(url) = lookup("DIGITALOCEAN_API_URL") {
            config.digitalocean_api_url = url;
        }

        Ok(config)
    }

    /// Age after which a tracked job may be matched again
    pub fn pickup_expiry(&self) -> Duration {
        self.pickup_delay + PICKUP_SAFETY_MARGIN
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.org_name.is_empty() {
            anyhow::bail!("org_name cannot be empty");
        }

        if self.labels.is_empty() {
            anyhow::bail!("at least one label must be monitored");
        }

        for (name, value) in [
            ("github_token", &self.github_token),
            ("digitalocean_token", &self.digitalocean_token),
            ("region", &self.region),
            ("image", &self.image),
            ("size", &self.size),
            ("tag", &self.tag),
        ] {
            if value.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        for (name, url) in [
            ("github_api_url", &self.github_api_url),
            ("digitalocean_api_url", &self.digitalocean_api_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.status_poll_interval.is_zero() {
            anyhow::bail!("status_poll_interval must be greater than 0");
        }

        Ok(())
    }
}
