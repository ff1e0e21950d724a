//! # ciao-types
//!
//! Shared types for the ciao control plane.
//!
//! This crate provides the data model (tenants, instances, workloads, nodes),
//! the identifier newtypes, the error taxonomy, and the `PersistentStore` port
//! trait used by both the Controller Datastore Cache and the Scheduler. It
//! exists to break the dependency cycle between `ciao-datastore` and
//! `ciao-scheduler`, which both need to talk about the same domain objects.
//!
//! ## Organization
//!
//! - `ids`: newtype wrappers around `Uuid` for each identifier space
//! - `model`: `Tenant`, `Instance`, `Workload`, `Node`, and their supporting types
//! - `errors`: the `CiaoError` taxonomy shared across crates
//! - `store`: the `PersistentStore` trait describing the durable-store contract

pub mod errors;
pub mod ids;
pub mod model;
pub mod net;
pub mod store;

pub use errors::{CiaoError, CiaoResult};
pub use ids::{InstanceId, NodeId, TenantId, WorkloadId};
pub use model::{
    ControllerRegistration, ControllerRole, EventLevel, EventLogEntry, FailureReason, Instance,
    InstanceState, Node, NodeKind, NodeStatus, RequestedResource, ResourceCounter, ResourceType,
    Tenant, UsageSample, Workload,
};
pub use net::{MacAddress, SubnetIndex};
pub use store::PersistentStore;
