//! Boot script rendering
//!
//! Every droplet boots with a user-data script that installs the runner
//! agent, registers it against the organization in ephemeral mode, runs
//! exactly one job and powers the machine off. The power-off is the only
//! completion signal the dispatcher observes.

use thiserror::Error;

/// Largest user-data payload the compute provider accepts
pub const MAX_BOOT_SCRIPT_BYTES: usize = 64 * 1024;

/// Errors raised while rendering a boot script
#[derive(Debug, Error)]
pub enum BootScriptError {
    #[error(
        "boot script would be {size} bytes, over the {limit} byte limit; shrink the custom setup script",
        limit = MAX_BOOT_SCRIPT_BYTES
    )]
    TooLarge { size: usize },
}

/// Values embedded in one instance's boot script
#[derive(Debug, Clone)]
pub struct BootScriptParams<'a> {
    pub labels: &'a [String],
    pub registration_token: &'a str,
    pub org_name: &'a str,
    pub runner_download_url: &'a str,
    pub runner_name: &'a str,
}

/// Boot script renderer
///
/// Holds the operator's custom setup fragment, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct BootScript {
    custom_fragment: Option<String>,
}

impl BootScript {
    /// Creates a boot script builder
    ///
    /// # Arguments
    /// * `custom_fragment` - Operator shell run before the runner agent installs
    pub fn new(custom_fragment: Option<String>) -> Self {
        Self { custom_fragment }
    }

    /// Renders the script for one instance
    ///
    /// Fails rather than truncating when the result exceeds
    /// [`MAX_BOOT_SCRIPT_BYTES`].
    pub fn render(&self, params: &BootScriptParams<'_>) -> Result<String, BootScriptError> {
        let custom = self.custom_fragment.as_deref().unwrap_or("");
        let labels = params.labels.join(",");

        let script = format!(
            r#"#!/usr/bin/env bash
mkdir /tmp/runner/work -p
chmod 777 /tmp/runner/work
{custom}
mkdir /actions-runner && cd /actions-runner
curl -o r.tar.gz -L {url}
tar xzf ./r.tar.gz
./bin/installdependencies.sh
useradd github
chown github . -R
mkdir -p /home/github
chown github /home/github -R
su github -c './config.sh --unattended --url https://github.com/{org} --token {token} --work /tmp/runner/work --labels {labels} --name {name} --ephemeral --disableupdate'
su github -c ./run.sh
poweroff
"#,
            custom = custom,
            url = params.runner_download_url,
            org = params.org_name,
            token = params.registration_token,
            labels = labels,
            name = params.runner_name,
        );

        // str::len is the UTF-8 byte length
        if script.len() > MAX_BOOT_SCRIPT_BYTES {
            return Err(BootScriptError::TooLarge { size: script.len() });
        }

        Ok(script)
    }
}
