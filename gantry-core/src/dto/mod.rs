//! Data Transfer Objects for provider communication
//!
//! Request and response payloads exchanged with the CI and compute
//! providers that have no life as domain entities of their own.

pub mod instance;
pub mod runner;
