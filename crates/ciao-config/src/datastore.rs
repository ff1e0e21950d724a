//! Configuration for the Controller Datastore Cache process.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};

/// §3 "Subnet allocation": the global search starts at `{16, 0}` and is
/// rejected past `(31, 255)`.
pub const SUBNET_SEARCH_START_HI: u8 = 16;
pub const SUBNET_SEARCH_START_LO: u8 = 0;
pub const SUBNET_SEARCH_CEILING_HI: u8 = 31;
pub const SUBNET_SEARCH_CEILING_LO: u8 = 255;

/// §3 UsageHistory: `P` minutes between appended samples.
pub const DEFAULT_USAGE_BUCKET_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Connection string for the persistent store backend. `None` selects
    /// the in-memory backend (tests, or a degraded/standalone deployment;
    /// §9 "dynamic dispatch over the persistent store").
    pub store_dsn: Option<String>,
    /// `P` from §3: minutes between appended usage-history samples.
    pub usage_bucket_minutes: i64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            store_dsn: None,
            usage_bucket_minutes: DEFAULT_USAGE_BUCKET_MINUTES,
        }
    }
}

impl DatastoreConfig {
    /// Layers environment overrides (`CIAO_DATASTORE_*`) on top of the
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let loader = EnvConfigLoader::new().with_prefix("CIAO_DATASTORE_");

        if let Some(dsn) = loader.get_optional("STORE_DSN") {
            config.store_dsn = Some(dsn);
        }
        if let Ok(minutes) = loader.get_uint("USAGE_BUCKET_MINUTES") {
            config.usage_bucket_minutes = minutes as i64;
        }
        config
    }
}
