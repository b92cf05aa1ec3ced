//! Core domain types
//!
//! This module contains the entities the dispatcher reasons about. CI types
//! mirror what GitHub reports for an organization; compute types mirror the
//! droplets Gantry provisions. They are snapshots taken per poll and are
//! never persisted.

pub mod check_run;
pub mod instance;
pub mod labels;
pub mod release;
pub mod repository;
pub mod workflow;
