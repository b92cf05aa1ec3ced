//! Pickup tracker
//!
//! Remembers which check-runs have already been handed to a provisioning
//! worker so that consecutive polls do not dispatch the same job twice.
//! Entries only ever leave through the time-based sweep: a job that
//! finishes quickly stays tracked until it ages out, and a job whose worker
//! died becomes eligible again once it does.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// In-memory set of recently dispatched check-runs
#[derive(Debug, Default)]
pub struct PickupTracker {
    /// check-run id -> first time it was dispatched
    pending: HashMap<u64, DateTime<Utc>>,
}

impl PickupTracker {
    /// Creates an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `job_id` was dispatched and has not aged out yet
    pub fn already_tracking(&self, job_id: u64) -> bool {
        self.pending.contains_key(&job_id)
    }

    /// Records a dispatch of `job_id` at `now`
    ///
    /// # Returns
    /// `false` if the job was already tracked; the original timestamp is kept
    pub fn record(&mut self, job_id: u64, now: DateTime<Utc>) -> bool {
        if self.pending.contains_key(&job_id) {
            return false;
        }
        self.pending.insert(job_id, now);
        true
    }

    /// Drops every entry whose age at `now` is `max_age` or more
    ///
    /// # Returns
    /// The number of entries dropped
    pub fn sweep(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let before = self.pending.len();
        // An unrepresentable max_age keeps everything.
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        self.pending.retain(|_, first_seen| now - *first_seen < max_age);
        before - self.pending.len()
    }
}
