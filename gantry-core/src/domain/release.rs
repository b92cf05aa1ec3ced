//! Runner agent release types

use serde::{Deserialize, Serialize};

/// A published release of the runner agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerRelease {
    /// Release tag, e.g. `v2.319.1`
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl RunnerRelease {
    /// Version string without the leading `v` of the tag
    pub fn version(&self) -> &str {
        self.tag_name.strip_prefix('v').unwrap_or(&self.tag_name)
    }

    /// Name of the Linux x64 tarball for this release
    pub fn linux_x64_asset_name(&self) -> String {
        format!("actions-runner-linux-x64-{}.tar.gz", self.version())
    }

    /// Download URL of the Linux x64 tarball, if the release carries one
    pub fn linux_x64_download_url(&self) -> Option<&str> {
        let wanted = self.linux_x64_asset_name();
        self.assets
            .iter()
            .find(|asset| asset.name == wanted)
            .map(|asset| asset.browser_download_url.as_str())
    }
}
