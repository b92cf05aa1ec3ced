//! Gantry Dispatcher
//!
//! Serves a GitHub organization's self-hosted runner labels with one
//! ephemeral DigitalOcean droplet per queued job.
//!
//! Architecture:
//! - Configuration: Load settings from the environment
//! - Repositories: GitHub and DigitalOcean access behind traits
//! - Services: Label resolution, pickup tracking, boot scripts, provisioning, reclaiming
//! - Scheduler: The deploy loop polling for queued jobs
//!
//! Leftover droplets are reclaimed before the loop starts and again after
//! it stops, whatever the reason.

mod config;
mod repository;
mod scheduler;
mod service;
mod shutdown;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{CiRepository, ComputeRepository, HttpCiRepository, HttpComputeRepository};
use crate::scheduler::DeployLoop;
use crate::service::{BootScript, ProvisioningWorker, Reclaimer, WorkflowTagResolver};
use crate::shutdown::install_shutdown_handler;
use gantry_client::{DigitalOceanClient, GitHubClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_dispatcher=info,gantry_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gantry Dispatcher");

    let config = load_config()?;
    info!(
        "Loaded configuration: org={}, labels=[{}], pickup_delay={:?}, region={}, size={}, tag={}",
        config.org_name,
        config.labels,
        config.pickup_delay,
        config.region,
        config.size,
        config.tag
    );

    let boot_script = load_boot_script(&config)?;

    let ci: Arc<dyn CiRepository> = Arc::new(HttpCiRepository::new(
        GitHubClient::new(&config.github_api_url, &config.github_token),
        config.org_name.clone(),
    ));
    let compute: Arc<dyn ComputeRepository> = Arc::new(HttpComputeRepository::new(
        DigitalOceanClient::new(&config.digitalocean_api_url, &config.digitalocean_token),
    ));
    let config = Arc::new(config);

    // First clean up by shutting down all running runners
    let reclaimer = Reclaimer::new(Arc::clone(&compute), config.tag.clone());
    let reclaimed = reclaimer
        .sweep()
        .await
        .context("Failed to reclaim droplets at startup")?;
    info!("Reclaimed {} droplet(s) at startup", reclaimed);

    let shutdown = install_shutdown_handler().context("Failed to install signal handlers")?;

    let worker = ProvisioningWorker::new(
        Arc::clone(&ci),
        Arc::clone(&compute),
        Arc::clone(&config),
        Arc::new(boot_script),
    );
    let deploy = DeployLoop::new(
        Arc::clone(&config),
        Arc::clone(&ci),
        Arc::new(WorkflowTagResolver::new(Arc::clone(&ci))),
        Arc::new(worker),
    );

    // Spawned so that a panic still reaches the cleanup below
    let outcome = tokio::spawn(deploy.run(shutdown)).await;

    // Try clean up by shutting down all running runners
    match reclaimer.sweep().await {
        Ok(count) => info!("Reclaimed {} droplet(s) at exit", count),
        Err(e) => error!("Failed to reclaim droplets at exit: {:#}", e),
    }

    info!("Exiting...");
    outcome.map_err(|e| anyhow::anyhow!("Deploy loop panicked: {}", e))?
}

/// Loads and validates configuration from environment variables
fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Reads the operator's custom setup fragment, if one is configured
fn load_boot_script(config: &Config) -> Result<BootScript> {
    let fragment = match &config.custom_setup_script {
        Some(path) => {
            let fragment = std::fs::read_to_string(path).with_context(|| {
                format!("Failed to read custom setup script {}", path.display())
            })?;
            info!("Using custom setup script {}", path.display());
            Some(fragment)
        }
        None => None,
    };

    Ok(BootScript::new(fragment))
}
