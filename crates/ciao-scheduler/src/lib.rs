//! # ciao-scheduler
//!
//! The SSNTP Scheduler (spec §4.2, §4.3): controller/compute/network
//! registries, first-fit placement with MRU-cursor spreading, and the
//! command/event router, assembled into one long-lived `SchedulerService`.

pub mod errors;
mod lock_order;
pub mod metrics;
pub mod placement;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod service;

pub use errors::{SchedulerError, SchedulerResult};
pub use metrics::SchedulerMetrics;
pub use router::RouteDecision;
pub use scheduler::{AgentKind, Scheduler};
pub use service::{SchedulerService, SchedulerServiceConfig};

/// Re-export commonly used types for consumers that only need the surface
/// API.
pub mod prelude {
    pub use crate::router::RouteDecision;
    pub use crate::scheduler::{AgentKind, Scheduler};
    pub use crate::service::{SchedulerService, SchedulerServiceConfig};
    pub use async_trait::async_trait;
}
