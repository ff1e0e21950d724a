//! Configuration for the Scheduler process.

use crate::env::EnvConfigLoader;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Stand-in for the SSNTP listen address; the transport itself is an
    /// out-of-scope collaborator (spec §1), but the daemon still needs
    /// something to report at startup.
    pub bind_address: String,
    /// Capacity of the `AllControllersSink` broadcast channel.
    pub controller_broadcast_capacity: usize,
    /// Enables the debug-only lock-order guard described in the expanded
    /// spec's Scheduler section. Always `false` in release builds
    /// regardless of this setting.
    pub assert_lock_order: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:8787".to_string(),
            controller_broadcast_capacity: 1024,
            assert_lock_order: cfg!(debug_assertions),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let loader = EnvConfigLoader::new().with_prefix("CIAO_SCHEDULER_");

        if let Some(addr) = loader.get_optional("BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Ok(cap) = loader.get_uint("CONTROLLER_BROADCAST_CAPACITY") {
            config.controller_broadcast_capacity = cap as usize;
        }
        if let Ok(assert_lock_order) = loader.get_bool("ASSERT_LOCK_ORDER") {
            config.assert_lock_order = assert_lock_order && cfg!(debug_assertions);
        }
        config
    }
}
