//! Core data model (spec §3).

use crate::ids::{InstanceId, NodeId, TenantId, WorkloadId};
use crate::net::{MacAddress, SubnetIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};

/// Resource counters tracked per tenant. `Instances` is counter type id 1,
/// incremented by `AddInstance` (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Instances,
    Vcpus,
    MemoryMb,
    DiskMb,
}

impl ResourceType {
    /// Persistent-store type id, stable across the four counters (§4.1:
    /// "resource type id = 1" for instances).
    pub fn type_id(self) -> i32 {
        match self {
            ResourceType::Instances => 1,
            ResourceType::Vcpus => 2,
            ResourceType::MemoryMb => 3,
            ResourceType::DiskMb => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceCounter {
    pub resource_type: ResourceType,
    pub limit: i64,
    pub usage: i64,
}

impl ResourceCounter {
    pub fn new(resource_type: ResourceType, limit: i64) -> Self {
        Self {
            resource_type,
            limit,
            usage: 0,
        }
    }

    pub fn would_exceed(&self, delta: i64) -> bool {
        delta > 0 && self.limit >= 0 && self.usage + delta > self.limit
    }
}

/// A requested resource line in a workload's default sizing (§3 Workload).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestedResource {
    pub resource_type: ResourceType,
    pub value: i64,
    pub mandatory: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmwareType {
    Legacy,
    Efi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HypervisorType {
    Qemu,
    Docker,
}

/// An immutable workload template (§3 Workload). Cached once on startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub id: WorkloadId,
    pub description: String,
    pub firmware_type: FirmwareType,
    pub hypervisor_type: HypervisorType,
    pub image_id: String,
    pub image_name: String,
    pub config: serde_json::Value,
    pub requested_resources: Vec<RequestedResource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    Pending,
    Running,
    Exited,
    Failed,
}

/// A running workload belonging to a tenant (§3 Instance).
///
/// Owned by the Datastore Cache's instance map; the tenant and node indices
/// reference it by id rather than holding their own copy, so a single
/// instance can't drift between the two indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub tenant_id: TenantId,
    pub workload_id: WorkloadId,
    pub node_id: Option<NodeId>,
    pub mac: MacAddress,
    pub ip: Option<Ipv4Addr>,
    pub ssh_ip: Option<IpAddr>,
    pub ssh_port: Option<u16>,
    pub state: InstanceState,
    pub cnci: bool,
    /// Resource usage deltas applied on create/delete (§3: "mapping from
    /// resource name to integer usage delta").
    pub usage: HashMap<ResourceType, i64>,
    pub created_at: DateTime<Utc>,
}

impl Instance {
    pub fn pending(
        id: InstanceId,
        tenant_id: TenantId,
        workload_id: WorkloadId,
        mac: MacAddress,
        usage: HashMap<ResourceType, i64>,
        cnci: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            workload_id,
            node_id: None,
            mac,
            ip: None,
            ssh_ip: None,
            ssh_port: None,
            state: InstanceState::Pending,
            cnci,
            usage,
            created_at,
        }
    }
}

/// Per-tenant subnet/host allocation (§3 "Subnet allocation").
///
/// `network` maps a claimed subnet index to the set of claimed host bytes in
/// `[2, 254]`; `subnets` is the ordered list of subnets the tenant has
/// claimed, in claim order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantNetwork {
    pub network: HashMap<SubnetIndex, HashSet<u8>>,
    pub subnets: Vec<SubnetIndex>,
}

/// An isolated customer account (§3 Tenant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub cnci_instance_id: Option<InstanceId>,
    pub cnci_mac: Option<MacAddress>,
    pub cnci_ip: Option<Ipv4Addr>,
    pub resources: Vec<ResourceCounter>,
    pub net: TenantNetwork,
    pub instances: HashSet<InstanceId>,
}

impl Tenant {
    pub fn new(id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cnci_instance_id: None,
            cnci_mac: None,
            cnci_ip: None,
            resources: vec![
                ResourceCounter::new(ResourceType::Instances, -1),
                ResourceCounter::new(ResourceType::Vcpus, -1),
                ResourceCounter::new(ResourceType::MemoryMb, -1),
                ResourceCounter::new(ResourceType::DiskMb, -1),
            ],
            net: TenantNetwork::default(),
            instances: HashSet::new(),
        }
    }

    pub fn resource_mut(&mut self, resource_type: ResourceType) -> &mut ResourceCounter {
        if let Some(idx) = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type)
        {
            return &mut self.resources[idx];
        }
        self.resources.push(ResourceCounter::new(resource_type, -1));
        self.resources.last_mut().unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Connected,
    Ready,
    Full,
    Maintenance,
    Offline,
}

/// Distinguishes the two node registries the Scheduler maintains (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Compute { instances: BTreeSet<InstanceId> },
    Network,
}

/// A compute or network node (§3 Node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub hostname: String,
    pub status: NodeStatus,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub cpu_load: f32,
    pub cpu_count: u32,
    pub kind: NodeKind,
}

impl Node {
    pub fn new_compute(id: NodeId, hostname: impl Into<String>) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            status: NodeStatus::Connected,
            memory_total_mb: 0,
            memory_available_mb: 0,
            cpu_load: 0.0,
            cpu_count: 0,
            kind: NodeKind::Compute {
                instances: BTreeSet::new(),
            },
        }
    }

    pub fn new_network(id: NodeId, hostname: impl Into<String>) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            status: NodeStatus::Connected,
            memory_total_mb: 0,
            memory_available_mb: 0,
            cpu_load: 0.0,
            cpu_count: 0,
            kind: NodeKind::Network,
        }
    }

    /// A compute node is a placement candidate only while `ready` (§4.2
    /// state machine).
    pub fn fits(&self, required_mb: u64) -> bool {
        self.status == NodeStatus::Ready && self.memory_available_mb >= required_mb
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerRole {
    Master,
    Backup,
}

/// A connected controller (§3 Controller Registration). At most one
/// registration has role `Master`, and it occupies position 0 of the
/// ordered registry the Scheduler keeps (enforced by `ciao-scheduler`, not
/// by this plain data type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerRegistration {
    pub id: String,
    pub role: ControllerRole,
}

/// A single usage-history sample (§3 UsageHistory).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageSample {
    pub cpu: i64,
    pub memory: i64,
    pub disk: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// An event-log entry (§6). Persistent-only; never cached (§4.1 "Logging").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub tenant_id: TenantId,
    pub level: EventLevel,
    pub message: String,
}

/// Reasons a workload failed to start, carried on `StartFailure` (§6, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    FullCloud,
    FullComputeNode,
    NoComputeNodes,
    NoNetworkNodes,
    InvalidPayload,
    InvalidData,
    ImageFailure,
    NetworkFailure,
    LaunchFailure,
    AlreadyRunning,
    InstanceExists,
}

impl FailureReason {
    /// §4.1: these reasons trigger the full deletion path (instance is torn
    /// down as though `DeleteInstance` had been called).
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            FailureReason::FullCloud
                | FailureReason::FullComputeNode
                | FailureReason::NoComputeNodes
                | FailureReason::NoNetworkNodes
                | FailureReason::InvalidPayload
                | FailureReason::InvalidData
                | FailureReason::ImageFailure
                | FailureReason::NetworkFailure
        )
    }
}
