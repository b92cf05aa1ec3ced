//! Workflow domain types
//!
//! `WorkflowRun` and `Workflow` are the metadata GitHub reports for a run;
//! `WorkflowDefinition` is the parsed YAML document that declares which
//! labels each job template runs on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::labels::LabelSet;

/// A workflow run waiting in the provider's queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    pub head_sha: String,
    #[serde(default)]
    pub check_suite_id: Option<u64>,
    #[serde(default)]
    pub check_suite_url: Option<String>,
}

impl WorkflowRun {
    /// Check suite holding this run's check-runs
    ///
    /// Falls back to the last path segment of `check_suite_url` when the id
    /// field is absent.
    pub fn check_suite_id(&self) -> Option<u64> {
        self.check_suite_id.or_else(|| {
            self.check_suite_url
                .as_deref()
                .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
                .and_then(|segment| segment.parse().ok())
        })
    }
}

/// Workflow metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    /// e.g. `https://github.com/acme/app/blob/main/.github/workflows/ci.yml`
    pub html_url: String,
}

impl Workflow {
    /// Raw source URL of this workflow file at `head_sha`
    ///
    /// Keeps the `https://host/owner/repo` prefix of the browser URL and
    /// replaces `blob/<ref>/...` with `raw/<sha>/<path>`.
    pub fn raw_source_url(&self, head_sha: &str) -> Option<String> {
        let parts: Vec<&str> = self.html_url.split('/').collect();
        if parts.len() < 7 || parts[5] != "blob" {
            return None;
        }
        Some(format!(
            "{}/raw/{}/{}",
            parts[..5].join("/"),
            head_sha,
            self.path.trim_start_matches('/')
        ))
    }
}

/// Errors raised while reading a workflow document
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid workflow document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("job '{0}' does not declare runs-on")]
    MissingRunsOn(String),

    #[error("job '{0}' has an unsupported runs-on value")]
    InvalidRunsOn(String),
}

/// A parsed workflow document
///
/// Templates are kept in document order.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub jobs: Vec<JobTemplate>,
}

/// One entry of the document's `jobs` mapping
#[derive(Debug, Clone)]
pub struct JobTemplate {
    /// Key under `jobs`
    pub key: String,
    pub name: Option<String>,
    /// Raw `runs-on` value, normalised on demand by [`JobTemplate::required_labels`]
    pub runs_on: Option<serde_yaml::Value>,
    /// Whether `strategy.matrix` is declared
    pub has_matrix: bool,
}

#[derive(Deserialize)]
struct RawWorkflow {
    jobs: serde_yaml::Mapping,
}

#[derive(Deserialize)]
struct RawJob {
    #[serde(default)]
    name: Option<serde_yaml::Value>,
    #[serde(default, rename = "runs-on")]
    runs_on: Option<serde_yaml::Value>,
    #[serde(default)]
    strategy: Option<serde_yaml::Value>,
}

impl WorkflowDefinition {
    /// Parses a workflow YAML document
    pub fn parse(source: &str) -> Result<Self, WorkflowError> {
        let raw: RawWorkflow = serde_yaml::from_str(source)?;

        // An entry that is not a job mapping cannot produce a check-run; it
        // is skipped so the remaining jobs stay resolvable.
        let mut jobs = Vec::with_capacity(raw.jobs.len());
        for (key, value) in raw.jobs {
            let Some(key) = scalar_string(&key) else {
                continue;
            };
            let Ok(job) = serde_yaml::from_value::<RawJob>(value) else {
                continue;
            };
            let has_matrix = job
                .strategy
                .as_ref()
                .is_some_and(|strategy| strategy.get("matrix").is_some());

            jobs.push(JobTemplate {
                key,
                name: job.name.as_ref().and_then(scalar_string),
                runs_on: job.runs_on,
                has_matrix,
            });
        }

        Ok(Self { jobs })
    }
}

impl JobTemplate {
    /// Name the provider displays for check-runs of this template
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// `runs-on` as a set of labels
    ///
    /// Accepts a single label, a list of labels, or a runner group mapping
    /// whose `labels` field is a label or list.
    pub fn required_labels(&self) -> Result<LabelSet, WorkflowError> {
        let runs_on = self
            .runs_on
            .as_ref()
            .ok_or_else(|| WorkflowError::MissingRunsOn(self.display_name().to_string()))?;

        let labels = match runs_on {
            serde_yaml::Value::Mapping(group) => group
                .get("labels")
                .map(label_list)
                .unwrap_or_else(|| Some(LabelSet::new())),
            other => label_list(other),
        };

        labels.ok_or_else(|| WorkflowError::InvalidRunsOn(self.display_name().to_string()))
    }
}

/// Scalars as GitHub displays them; `name: 2024` shows up as `2024`
fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn label_list(value: &serde_yaml::Value) -> Option<LabelSet> {
    match value {
        serde_yaml::Value::String(label) => Some(LabelSet::from([label.clone()])),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}
