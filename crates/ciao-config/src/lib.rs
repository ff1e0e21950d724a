//! # ciao-config
//!
//! Layered configuration for the ciao control plane: built-in defaults,
//! overridden by environment variables. Each process (scheduler daemon,
//! controller/datastore daemon) gets its own config struct; both derive
//! `serde::Deserialize` so a deployment can also feed them from a config
//! file via `serde_yaml`/`toml` without this crate needing to know which.

mod datastore;
mod env;
mod scheduler;

pub use datastore::{
    DatastoreConfig, DEFAULT_USAGE_BUCKET_MINUTES, SUBNET_SEARCH_CEILING_HI,
    SUBNET_SEARCH_CEILING_LO, SUBNET_SEARCH_START_HI, SUBNET_SEARCH_START_LO,
};
pub use env::{EnvConfigLoader, EnvError};
pub use scheduler::SchedulerConfig;
