//! Runner label sets

use std::collections::BTreeSet;

/// Labels a job requires from the runner that executes it
pub type LabelSet = BTreeSet<String>;

/// The labels this deployment serves
///
/// Keeps configuration order (first occurrence wins on duplicates) so the
/// labels a runner registers with read the same way they were configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoredLabels {
    labels: Vec<String>,
}

impl MonitoredLabels {
    /// Builds the set from individual labels, dropping blanks and duplicates
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into().trim().to_string();
            if !label.is_empty() && !kept.contains(&label) {
                kept.push(label);
            }
        }
        Self { labels: kept }
    }

    /// Parses a comma separated list, e.g. `self-hosted,linux`
    pub fn parse(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Whether a job requiring `required` should be served by this deployment
    pub fn intersects(&self, required: &LabelSet) -> bool {
        self.labels.iter().any(|label| required.contains(label))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl std::fmt::Display for MonitoredLabels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.labels.join(","))
    }
}
