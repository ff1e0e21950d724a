//! An in-memory [`PersistentStore`], used by every crate's test suite and
//! by the `ciao-scheduler` binary when no DSN is configured. Grounded on
//! the same "swap the backend, keep the contract" port/adapter split the
//! Postgres adapter uses; this one just never leaves the process.

use async_trait::async_trait;
use ciao_types::store::{FrameBatchSummary, FrameStat, NodeSummary};
use ciao_types::{
    CiaoError, CiaoResult, EventLogEntry, Instance, InstanceId, Node, NodeId, PersistentStore,
    ResourceType, Tenant, TenantId, UsageSample, Workload, WorkloadId,
};
use ciao_types::net::SubnetIndex;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryStore {
    tenants: Mutex<HashMap<TenantId, Tenant>>,
    instances: Mutex<HashMap<InstanceId, Instance>>,
    workloads: Mutex<HashMap<WorkloadId, Workload>>,
    cnci_workload_id: Mutex<Option<WorkloadId>>,
    usage: Mutex<HashMap<TenantId, Vec<UsageSample>>>,
    events: Mutex<HashMap<TenantId, Vec<EventLogEntry>>>,
    node_stats: Mutex<HashMap<NodeId, Node>>,
    frame_stats: Mutex<Vec<FrameStat>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo helper: seeds a workload and marks it as the CNCI
    /// template, as an operator's bootstrap script would.
    pub fn seed_workload(&self, workload: Workload, is_cnci: bool) {
        let id = workload.id;
        self.workloads.lock().insert(id, workload);
        if is_cnci {
            *self.cnci_workload_id.lock() = Some(id);
        }
    }
}

#[async_trait]
impl PersistentStore for InMemoryStore {
    async fn disconnect(&self) -> CiaoResult<()> {
        Ok(())
    }

    async fn add_tenant(&self, tenant: &Tenant) -> CiaoResult<()> {
        self.tenants.lock().insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, id: TenantId) -> CiaoResult<Tenant> {
        self.tenants
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| CiaoError::not_found(format!("tenant {id}")))
    }

    async fn get_all_tenants(&self) -> CiaoResult<Vec<Tenant>> {
        Ok(self.tenants.lock().values().cloned().collect())
    }

    async fn update_tenant(&self, tenant: &Tenant) -> CiaoResult<()> {
        self.tenants.lock().insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn delete_tenant(&self, id: TenantId) -> CiaoResult<()> {
        self.tenants.lock().remove(&id);
        Ok(())
    }

    async fn add_limit(
        &self,
        tenant: TenantId,
        resource_type: ResourceType,
        limit: i64,
    ) -> CiaoResult<()> {
        let mut tenants = self.tenants.lock();
        let t = tenants
            .get_mut(&tenant)
            .ok_or_else(|| CiaoError::not_found(format!("tenant {tenant}")))?;
        t.resource_mut(resource_type).limit = limit;
        Ok(())
    }

    async fn claim_tenant_ip(
        &self,
        tenant: TenantId,
        subnet: SubnetIndex,
        host: u8,
    ) -> CiaoResult<()> {
        let mut tenants = self.tenants.lock();
        let t = tenants
            .get_mut(&tenant)
            .ok_or_else(|| CiaoError::not_found(format!("tenant {tenant}")))?;
        if !t.net.network.contains_key(&subnet) {
            t.net.subnets.push(subnet);
        }
        t.net.network.entry(subnet).or_default().insert(host);
        Ok(())
    }

    async fn release_tenant_ip(
        &self,
        tenant: TenantId,
        subnet: SubnetIndex,
        host: u8,
    ) -> CiaoResult<()> {
        let mut tenants = self.tenants.lock();
        let t = tenants
            .get_mut(&tenant)
            .ok_or_else(|| CiaoError::not_found(format!("tenant {tenant}")))?;
        if let Some(hosts) = t.net.network.get_mut(&subnet) {
            hosts.remove(&host);
        }
        Ok(())
    }

    async fn add_instance(&self, instance: &Instance) -> CiaoResult<()> {
        self.instances.lock().insert(instance.id, instance.clone());
        Ok(())
    }

    async fn list_instances(&self) -> CiaoResult<Vec<Instance>> {
        Ok(self.instances.lock().values().cloned().collect())
    }

    async fn remove_instance(&self, id: InstanceId) -> CiaoResult<()> {
        self.instances.lock().remove(&id);
        Ok(())
    }

    async fn delete_usage(&self, instance: InstanceId) -> CiaoResult<()> {
        // The memory store indexes usage history by tenant, not instance;
        // per-instance usage bookkeeping lives entirely in the cache.
        let _ = instance;
        Ok(())
    }

    async fn add_node_stat(&self, node: &Node) -> CiaoResult<()> {
        self.node_stats.lock().insert(node.id, node.clone());
        Ok(())
    }

    async fn add_instance_stats(&self, instances: &[Instance], _node_id: NodeId) -> CiaoResult<()> {
        let mut store = self.instances.lock();
        for instance in instances {
            store.insert(instance.id, instance.clone());
        }
        Ok(())
    }

    async fn add_frame_stat(&self, stat: FrameStat) -> CiaoResult<()> {
        self.frame_stats.lock().push(stat);
        Ok(())
    }

    async fn get_batch_frame_summary(&self, label: &str) -> CiaoResult<FrameBatchSummary> {
        let stats = self.frame_stats.lock();
        let matching: Vec<_> = stats
            .iter()
            .filter(|s| s.frame_type == label)
            .collect();
        Ok(FrameBatchSummary {
            label: label.to_string(),
            count: matching.len() as u64,
            first: matching.iter().map(|s| s.recorded_at).min(),
            last: matching.iter().map(|s| s.recorded_at).max(),
        })
    }

    async fn get_node_summary(&self, node_id: NodeId) -> CiaoResult<NodeSummary> {
        let stats = self.node_stats.lock();
        let node = stats
            .get(&node_id)
            .ok_or_else(|| CiaoError::not_found(format!("node {node_id}")))?;
        let instance_count = self
            .instances
            .lock()
            .values()
            .filter(|i| i.node_id == Some(node_id))
            .count() as u64;
        Ok(NodeSummary {
            node_id,
            memory_total_mb: node.memory_total_mb,
            memory_available_mb: node.memory_available_mb,
            cpu_load: node.cpu_load,
            instance_count,
        })
    }

    async fn append_usage_sample(&self, tenant: TenantId, sample: UsageSample) -> CiaoResult<()> {
        self.usage.lock().entry(tenant).or_default().push(sample);
        Ok(())
    }

    async fn get_usage_history(&self, tenant: TenantId) -> CiaoResult<Vec<UsageSample>> {
        self.usage
            .lock()
            .get(&tenant)
            .cloned()
            .ok_or_else(|| CiaoError::not_found(format!("usage history for tenant {tenant}")))
    }

    async fn log_event(&self, entry: EventLogEntry) -> CiaoResult<()> {
        self.events
            .lock()
            .entry(entry.tenant_id)
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn clear_events(&self, tenant: TenantId) -> CiaoResult<()> {
        self.events.lock().remove(&tenant);
        Ok(())
    }

    async fn get_events(&self, tenant: TenantId) -> CiaoResult<Vec<EventLogEntry>> {
        Ok(self.events.lock().get(&tenant).cloned().unwrap_or_default())
    }

    async fn get_cnci_workload_id(&self) -> CiaoResult<WorkloadId> {
        self.cnci_workload_id
            .lock()
            .ok_or_else(|| CiaoError::not_found("no CNCI workload configured"))
    }

    async fn get_workload(&self, id: WorkloadId) -> CiaoResult<Workload> {
        self.workloads
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| CiaoError::not_found(format!("workload {id}")))
    }

    async fn get_all_workloads(&self) -> CiaoResult<Vec<Workload>> {
        Ok(self.workloads.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciao_types::Tenant;

    #[tokio::test]
    async fn get_tenant_on_empty_store_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_tenant(TenantId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn claim_then_release_tenant_ip_clears_host() {
        let store = InMemoryStore::new();
        let id = TenantId::new();
        store.add_tenant(&Tenant::new(id, "acme")).await.unwrap();
        let subnet = SubnetIndex::new(16, 0);
        store.claim_tenant_ip(id, subnet, 2).await.unwrap();
        assert!(store.tenants.lock()[&id].net.network[&subnet].contains(&2));
        store.release_tenant_ip(id, subnet, 2).await.unwrap();
        assert!(!store.tenants.lock()[&id].net.network[&subnet].contains(&2));
    }

    #[tokio::test]
    async fn get_usage_history_errors_when_absent_but_empty_after_append() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        assert!(store.get_usage_history(tenant).await.is_err());
        store
            .append_usage_sample(
                tenant,
                UsageSample {
                    cpu: 1,
                    memory: 1,
                    disk: 1,
                    timestamp: chrono::Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get_usage_history(tenant).await.unwrap().len(), 1);
    }
}
