//! Test data factories for creating ciao domain objects.

use ciao_types::{
    ControllerRegistration, ControllerRole, FirmwareType, HypervisorType, Instance, InstanceId,
    MacAddress, Node, NodeId, RequestedResource, ResourceType, Tenant, TenantId, Workload,
    WorkloadId,
};
use chrono::Utc;
use std::collections::HashMap;

/// Builder for a test [`Tenant`].
#[derive(Debug, Clone)]
pub struct TenantBuilder {
    id: TenantId,
    name: String,
    limits: Vec<(ResourceType, i64)>,
}

impl Default for TenantBuilder {
    fn default() -> Self {
        Self {
            id: TenantId::new(),
            name: "test-tenant".to_string(),
            limits: Vec::new(),
        }
    }
}

impl TenantBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: TenantId) -> Self {
        self.id = id;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_limit(mut self, resource_type: ResourceType, limit: i64) -> Self {
        self.limits.push((resource_type, limit));
        self
    }

    pub fn build(self) -> Tenant {
        let mut tenant = Tenant::new(self.id, self.name);
        for (resource_type, limit) in self.limits {
            tenant.resource_mut(resource_type).limit = limit;
        }
        tenant
    }
}

/// Builder for a test [`Workload`].
#[derive(Debug, Clone)]
pub struct WorkloadBuilder {
    id: WorkloadId,
    description: String,
    firmware_type: FirmwareType,
    hypervisor_type: HypervisorType,
    image_id: String,
    image_name: String,
    requested_resources: Vec<RequestedResource>,
}

impl Default for WorkloadBuilder {
    fn default() -> Self {
        Self {
            id: WorkloadId::new(),
            description: "test workload".to_string(),
            firmware_type: FirmwareType::Efi,
            hypervisor_type: HypervisorType::Qemu,
            image_id: "00000000-0000-0000-0000-000000000001".to_string(),
            image_name: "test-image".to_string(),
            requested_resources: vec![
                RequestedResource {
                    resource_type: ResourceType::Vcpus,
                    value: 2,
                    mandatory: true,
                },
                RequestedResource {
                    resource_type: ResourceType::MemoryMb,
                    value: 512,
                    mandatory: true,
                },
            ],
        }
    }
}

impl WorkloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: WorkloadId) -> Self {
        self.id = id;
        self
    }

    pub fn hypervisor(mut self, hypervisor_type: HypervisorType) -> Self {
        self.hypervisor_type = hypervisor_type;
        self
    }

    pub fn memory_mb(mut self, value: i64) -> Self {
        if let Some(entry) = self
            .requested_resources
            .iter_mut()
            .find(|r| r.resource_type == ResourceType::MemoryMb)
        {
            entry.value = value;
        }
        self
    }

    pub fn build(self) -> Workload {
        Workload {
            id: self.id,
            description: self.description,
            firmware_type: self.firmware_type,
            hypervisor_type: self.hypervisor_type,
            image_id: self.image_id,
            image_name: self.image_name,
            config: serde_json::json!({}),
            requested_resources: self.requested_resources,
        }
    }
}

/// Builder for a test [`Instance`] in the `Pending` state.
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    id: InstanceId,
    tenant_id: TenantId,
    workload_id: WorkloadId,
    mac: MacAddress,
    cnci: bool,
    usage: HashMap<ResourceType, i64>,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        let mut usage = HashMap::new();
        usage.insert(ResourceType::Instances, 1);
        usage.insert(ResourceType::Vcpus, 2);
        usage.insert(ResourceType::MemoryMb, 512);
        Self {
            id: InstanceId::new(),
            tenant_id: TenantId::new(),
            workload_id: WorkloadId::new(),
            mac: Factory::mac(),
            cnci: false,
            usage,
        }
    }
}

impl InstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: InstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn workload(mut self, workload_id: WorkloadId) -> Self {
        self.workload_id = workload_id;
        self
    }

    pub fn cnci(mut self, cnci: bool) -> Self {
        self.cnci = cnci;
        self
    }

    pub fn build(self) -> Instance {
        Instance::pending(
            self.id,
            self.tenant_id,
            self.workload_id,
            self.mac,
            self.usage,
            self.cnci,
            Utc::now(),
        )
    }
}

/// Builder for a test compute [`Node`].
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    id: NodeId,
    hostname: String,
    memory_total_mb: u64,
    memory_available_mb: u64,
    cpu_count: u32,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self {
            id: NodeId::new(),
            hostname: "test-node".to_string(),
            memory_total_mb: 8192,
            memory_available_mb: 8192,
            cpu_count: 4,
        }
    }
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn memory_available_mb(mut self, mb: u64) -> Self {
        self.memory_available_mb = mb;
        self
    }

    pub fn build_compute(self) -> Node {
        let mut node = Node::new_compute(self.id, self.hostname);
        node.memory_total_mb = self.memory_total_mb;
        node.memory_available_mb = self.memory_available_mb;
        node.cpu_count = self.cpu_count;
        node
    }

    pub fn build_network(self) -> Node {
        let mut node = Node::new_network(self.id, self.hostname);
        node.memory_total_mb = self.memory_total_mb;
        node.memory_available_mb = self.memory_available_mb;
        node.cpu_count = self.cpu_count;
        node
    }
}

/// Ad-hoc helpers for values that don't need a full builder.
pub struct Factory;

impl Factory {
    /// A valid CNCI-eligible MAC (locally administered, unicast).
    pub fn mac() -> MacAddress {
        MacAddress([0x02, 0x01, 0x00, 0x00, 0x00, 0x01])
    }

    pub fn controller(role: ControllerRole) -> ControllerRegistration {
        ControllerRegistration {
            id: format!("controller-{}", uuid::Uuid::new_v4()),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_builder_applies_limits() {
        let tenant = TenantBuilder::new()
            .name("acme")
            .with_limit(ResourceType::Instances, 10)
            .build();

        assert_eq!(tenant.name, "acme");
        assert_eq!(
            tenant
                .resources
                .iter()
                .find(|r| r.resource_type == ResourceType::Instances)
                .unwrap()
                .limit,
            10
        );
    }

    #[test]
    fn instance_builder_produces_pending_instance() {
        let tenant_id = TenantId::new();
        let instance = InstanceBuilder::new().tenant(tenant_id).build();

        assert_eq!(instance.tenant_id, tenant_id);
        assert!(instance.node_id.is_none());
        assert!(instance.ip.is_none());
    }

    #[test]
    fn node_builder_produces_ready_for_allocation_fields() {
        let node = NodeBuilder::new().memory_available_mb(4096).build_compute();
        assert_eq!(node.memory_available_mb, 4096);
    }

    #[test]
    fn workload_builder_overrides_memory() {
        let workload = WorkloadBuilder::new().memory_mb(1024).build();
        let mem = workload
            .requested_resources
            .iter()
            .find(|r| r.resource_type == ResourceType::MemoryMb)
            .unwrap();
        assert_eq!(mem.value, 1024);
    }
}
