//! Scheduler layer for the dispatcher
//!
//! This layer polls GitHub for queued jobs and drives them through
//! label resolution, deduplication and provisioning. It owns the only
//! mutable dispatch state, the pickup tracker.

pub mod deploy_loop;

pub use deploy_loop::DeployLoop;
