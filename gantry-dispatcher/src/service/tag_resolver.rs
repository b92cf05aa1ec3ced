//! Tag resolver
//!
//! Works out which runner labels a queued check-run needs by reading the
//! `runs-on` of the matching job template in the run's workflow file.
//!
//! Check-runs of a matrix job are displayed as `build (linux, x64)` while
//! the template is just `build`. The suffix is stripped with a heuristic
//! tied to GitHub's display convention; it only lives here so it can be
//! replaced without touching dispatch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use gantry_core::domain::check_run::CheckRun;
use gantry_core::domain::labels::LabelSet;
use gantry_core::domain::repository::Repository;
use gantry_core::domain::workflow::{JobTemplate, WorkflowDefinition, WorkflowRun};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::repository::CiRepository;

/// Bare template name, then the parenthesized matrix suffix
static MATRIX_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)( \(.*\))").expect("matrix name pattern is valid"));

/// Label resolution for queued check-runs
#[async_trait]
pub trait TagResolver: Send + Sync {
    /// Labels required by `check_run`, or `None` when they cannot be determined
    ///
    /// Failures are logged and reported as `None`; the job is simply looked
    /// at again on the next poll.
    async fn resolve(&self, scope: &mut RunScope, check_run: &CheckRun) -> Option<LabelSet>;
}

/// Per-run state shared by the resolutions of one run's check-runs
///
/// The workflow document is loaded on first use and dropped with the scope
/// at the end of the run's processing.
pub struct RunScope {
    pub repo: Repository,
    pub run: WorkflowRun,
    workflow: Option<WorkflowDefinition>,
}

impl RunScope {
    /// Opens a scope for one queued run; nothing is fetched until first use
    pub fn new(repo: Repository, run: WorkflowRun) -> Self {
        Self {
            repo,
            run,
            workflow: None,
        }
    }
}

/// Resolves labels from the workflow file at the run's head commit
pub struct WorkflowTagResolver {
    ci: Arc<dyn CiRepository>,
}

impl WorkflowTagResolver {
    /// Creates a resolver reading workflows through `ci`
    pub fn new(ci: Arc<dyn CiRepository>) -> Self {
        Self { ci }
    }

    async fn load_workflow(&self, repo: &Repository, run: &WorkflowRun) -> Result<WorkflowDefinition> {
        let workflow = self.ci.get_workflow(repo, run.workflow_id).await?;

        debug!("Loading workflow {} at {}", workflow.name, run.head_sha);
        let source = self
            .ci
            .fetch_workflow_source(repo, &workflow, &run.head_sha)
            .await?;

        WorkflowDefinition::parse(&source)
            .with_context(|| format!("Failed to parse workflow {}", workflow.path))
    }
}

#[async_trait]
impl TagResolver for WorkflowTagResolver {
    async fn resolve(&self, scope: &mut RunScope, check_run: &CheckRun) -> Option<LabelSet> {
        if scope.workflow.is_none() {
            match self.load_workflow(&scope.repo, &scope.run).await {
                Ok(workflow) => scope.workflow = Some(workflow),
                Err(e) => {
                    warn!(
                        "[{}] Failed to load workflow of run {}: {:#}",
                        check_run.id, scope.run.id, e
                    );
                    return None;
                }
            }
        }
        let workflow = scope.workflow.as_ref()?;

        let Some(template) = find_template(workflow, &check_run.name) else {
            debug!(
                "[{}] No job template named '{}' in run {}",
                check_run.id, check_run.name, scope.run.id
            );
            return None;
        };

        match template.required_labels() {
            Ok(labels) => Some(labels),
            Err(e) => {
                warn!("[{}] {}", check_run.id, e);
                None
            }
        }
    }
}

/// First template, in document order, that produced `check_run_name`
pub fn find_template<'a>(
    workflow: &'a WorkflowDefinition,
    check_run_name: &str,
) -> Option<&'a JobTemplate> {
    workflow.jobs.iter().find(|template| {
        let name = if template.has_matrix {
            strip_matrix_suffix(check_run_name)
        } else {
            check_run_name
        };
        template.display_name() == name
    })
}

/// `build (linux, x64)` -> `build`; names without a suffix are unchanged
pub fn strip_matrix_suffix(check_run_name: &str) -> &str {
    MATRIX_NAME
        .captures(check_run_name)
        .and_then(|captures| captures.get(1))
        .map_or(check_run_name, |bare| bare.as_str())
}
