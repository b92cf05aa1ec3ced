//! Gantry Core
//!
//! Core types shared by the Gantry runner dispatcher and its HTTP clients.
//!
//! This crate contains:
//! - Domain types: CI and compute entities (CheckRun, WorkflowRun, Instance, etc.)
//! - DTOs: Request and response payloads sent to the providers

pub mod domain;
pub mod dto;
