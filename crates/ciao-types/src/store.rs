//! The persistent-store port (§6, §9 "dynamic dispatch over the persistent
//! store").
//!
//! This is the capability interface the Datastore Cache is generic over.
//! Any backend — SQL-backed, in-memory, or otherwise — that implements these
//! operation contracts may be substituted; the cache never depends on a
//! concrete backend.

use crate::errors::CiaoResult;
use crate::ids::{InstanceId, NodeId, TenantId, WorkloadId};
use crate::model::{EventLogEntry, Instance, Node, ResourceType, Tenant, UsageSample, Workload};
use crate::net::SubnetIndex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A single recorded STATS/READY frame, kept for diagnostics (§6 "frame
/// traces").
#[derive(Debug, Clone)]
pub struct FrameStat {
    pub node_id: NodeId,
    pub frame_type: String,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate counters the store can report for a batch of frames sharing a
/// label (operator-facing diagnostics; §6 "get batch frame summary /
/// statistics(label)").
#[derive(Debug, Clone, Default)]
pub struct FrameBatchSummary {
    pub label: String,
    pub count: u64,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

/// A point-in-time resource summary for one node (§6 "get node summary").
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub node_id: NodeId,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub cpu_load: f32,
    pub instance_count: u64,
}

/// The durable-store contract required by `ciao-datastore` (§6). Assumed
/// transactional per-call; not assumed transactional across calls (§2).
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn disconnect(&self) -> CiaoResult<()>;

    // -- Tenants -----------------------------------------------------
    async fn add_tenant(&self, tenant: &Tenant) -> CiaoResult<()>;
    async fn get_tenant(&self, id: TenantId) -> CiaoResult<Tenant>;
    async fn get_all_tenants(&self) -> CiaoResult<Vec<Tenant>>;
    async fn update_tenant(&self, tenant: &Tenant) -> CiaoResult<()>;
    async fn delete_tenant(&self, id: TenantId) -> CiaoResult<()>;
    async fn add_limit(&self, tenant: TenantId, resource_type: ResourceType, limit: i64)
        -> CiaoResult<()>;

    // -- IP allocation -------------------------------------------------
    async fn claim_tenant_ip(
        &self,
        tenant: TenantId,
        subnet: SubnetIndex,
        host: u8,
    ) -> CiaoResult<()>;
    async fn release_tenant_ip(
        &self,
        tenant: TenantId,
        subnet: SubnetIndex,
        host: u8,
    ) -> CiaoResult<()>;

    // -- Instances -------------------------------------------------------
    async fn add_instance(&self, instance: &Instance) -> CiaoResult<()>;
    async fn list_instances(&self) -> CiaoResult<Vec<Instance>>;
    async fn remove_instance(&self, id: InstanceId) -> CiaoResult<()>;
    async fn delete_usage(&self, instance: InstanceId) -> CiaoResult<()>;

    // -- Stats -----------------------------------------------------------
    async fn add_node_stat(&self, node: &Node) -> CiaoResult<()>;
    async fn add_instance_stats(&self, instances: &[Instance], node_id: NodeId) -> CiaoResult<()>;
    async fn add_frame_stat(&self, stat: FrameStat) -> CiaoResult<()>;
    async fn get_batch_frame_summary(&self, label: &str) -> CiaoResult<FrameBatchSummary>;
    async fn get_node_summary(&self, node_id: NodeId) -> CiaoResult<NodeSummary>;

    // -- Usage history -----------------------------------------------------
    async fn append_usage_sample(&self, tenant: TenantId, sample: UsageSample) -> CiaoResult<()>;
    async fn get_usage_history(&self, tenant: TenantId) -> CiaoResult<Vec<UsageSample>>;

    // -- Events -----------------------------------------------------------
    async fn log_event(&self, entry: EventLogEntry) -> CiaoResult<()>;
    async fn clear_events(&self, tenant: TenantId) -> CiaoResult<()>;
    async fn get_events(&self, tenant: TenantId) -> CiaoResult<Vec<EventLogEntry>>;

    // -- Workloads -------------------------------------------------------
    async fn get_cnci_workload_id(&self) -> CiaoResult<WorkloadId>;
    async fn get_workload(&self, id: WorkloadId) -> CiaoResult<Workload>;
    async fn get_all_workloads(&self) -> CiaoResult<Vec<Workload>>;
}
