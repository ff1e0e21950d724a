//! Common test utilities for the ciao control plane.
//!
//! This crate provides shared fixtures, factories, and assertions used
//! across `ciao-datastore` and `ciao-scheduler` test suites.

pub mod assertions;
pub mod factories;
pub mod fixtures;

/// Re-export commonly used test dependencies
pub use anyhow::{anyhow, Result};
pub use tempfile;
pub use tokio;
