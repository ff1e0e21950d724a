//! Stats ingestion (spec §4.1 "Stats ingestion"). Decoupled from the
//! SSNTP wire format: the router translates a `StatsPayload` into these
//! domain-level reports before calling into the cache.

use crate::cache::{DatastoreCache, InstanceStatSnapshot};
use crate::errors::DatastoreResult;
use crate::lock_order::{self, LockId};
use chrono::Utc;
use ciao_types::{Instance, InstanceId, InstanceState, Node, NodeId, NodeKind};
use std::net::IpAddr;

/// A single instance's reported resource usage and lifecycle state, as
/// carried in a STATS frame's instance list.
#[derive(Debug, Clone, Copy)]
pub struct InstanceStatReport {
    pub instance_id: InstanceId,
    pub state: InstanceState,
    pub ssh_ip: Option<IpAddr>,
    pub ssh_port: Option<u16>,
    pub cpu_usage: i64,
    pub memory_usage_mb: i64,
    pub disk_usage_mb: i64,
}

/// A node-level stats or READY report.
#[derive(Debug, Clone)]
pub struct NodeStatReport {
    pub node_id: NodeId,
    pub hostname: String,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub cpu_load: f32,
    pub cpu_count: u32,
}

impl DatastoreCache {
    /// Node-level half of `HandleStats`: upserts the node, records the
    /// last-stat snapshot (via `add_node_stat`), and persists.
    pub async fn handle_node_stat(&self, report: NodeStatReport) -> DatastoreResult<()> {
        let node = {
            let _g = lock_order::enter(LockId::Nodes);
            let mut nodes = self.nodes.write();
            let node = nodes
                .entry(report.node_id)
                .or_insert_with(|| Node::new_compute(report.node_id, report.hostname.clone()));
            node.hostname = report.hostname;
            node.memory_total_mb = report.memory_total_mb;
            node.memory_available_mb = report.memory_available_mb;
            node.cpu_load = report.cpu_load;
            node.cpu_count = report.cpu_count;
            node.clone()
        };
        self.store.add_node_stat(&node).await?;
        Ok(())
    }

    /// Instance-stat half of `HandleStats`: for each reported instance,
    /// computes the usage delta against the last recorded stat, fires
    /// `update_tenant_usage` in the background, replaces the last-stat
    /// entry, updates the cached `Instance`, and ensures the node-instance
    /// index includes it. Persists the whole batch at the end.
    pub async fn handle_instance_stats(
        &self,
        node_id: NodeId,
        reports: Vec<InstanceStatReport>,
    ) -> DatastoreResult<()> {
        let mut updated = Vec::with_capacity(reports.len());
        for report in &reports {
            let delta = {
                let _g_last = lock_order::enter(LockId::InstanceLastStat);
                let mut last_stats = self.instance_last_stat.write();
                let previous = last_stats.get(&report.instance_id).copied();
                let delta = match previous {
                    Some(prev) => (
                        report.cpu_usage - prev.cpu,
                        report.memory_usage_mb - prev.memory,
                        report.disk_usage_mb - prev.disk,
                    ),
                    None => (report.cpu_usage, report.memory_usage_mb, report.disk_usage_mb),
                };
                last_stats.insert(
                    report.instance_id,
                    InstanceStatSnapshot {
                        cpu: report.cpu_usage,
                        memory: report.memory_usage_mb,
                        disk: report.disk_usage_mb,
                        recorded_at: Utc::now(),
                    },
                );
                delta
            };
            let tenant_id = {
                let _g_inst = lock_order::enter(LockId::Instances);
                self.instances
                    .read()
                    .get(&report.instance_id)
                    .map(|i| i.tenant_id)
            };

            if let Some(tenant_id) = tenant_id {
                let (cpu, memory, disk) = delta;
                let _ = self.update_tenant_usage(tenant_id, cpu, memory, disk).await;
            }

            let instance = {
                let _g = lock_order::enter(LockId::Instances);
                let mut instances = self.instances.write();
                if let Some(instance) = instances.get_mut(&report.instance_id) {
                    instance.state = report.state;
                    instance.node_id = Some(node_id);
                    instance.ssh_ip = report.ssh_ip;
                    instance.ssh_port = report.ssh_port;
                    Some(instance.clone())
                } else {
                    None
                }
            };

            if let Some(instance) = instance {
                self.ensure_node_index(node_id, instance.id);
                updated.push(instance);
            }
        }

        if !updated.is_empty() {
            self.store.add_instance_stats(&updated, node_id).await?;
        }
        Ok(())
    }

    fn ensure_node_index(&self, node_id: NodeId, instance_id: InstanceId) {
        let _g = lock_order::enter(LockId::Nodes);
        let mut nodes = self.nodes.write();
        let node = nodes
            .entry(node_id)
            .or_insert_with(|| Node::new_compute(node_id, ""));
        if let NodeKind::Compute { instances } = &mut node.kind {
            instances.insert(instance_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use ciao_test_utils::factories::InstanceBuilder;
    use std::sync::Arc;

    async fn fresh_cache() -> Arc<DatastoreCache> {
        let store = Arc::new(InMemoryStore::new());
        Arc::new(DatastoreCache::load(store, 5).await.unwrap())
    }

    #[tokio::test]
    async fn repeated_identical_stat_grows_history_by_at_most_one() {
        let cache = fresh_cache().await;
        let tenant = ciao_types::TenantId::new();
        cache.add_tenant(tenant, "acme").await.unwrap();
        let instance = InstanceBuilder::new().tenant(tenant).build();
        let id = instance.id;
        cache.add_instance(instance).await.unwrap();

        let node_id = NodeId::new();
        let report = InstanceStatReport {
            instance_id: id,
            state: InstanceState::Running,
            ssh_ip: None,
            ssh_port: None,
            cpu_usage: 10,
            memory_usage_mb: 100,
            disk_usage_mb: 200,
        };
        cache
            .handle_instance_stats(node_id, vec![report])
            .await
            .unwrap();
        cache
            .handle_instance_stats(node_id, vec![report])
            .await
            .unwrap();

        let history = cache
            .get_tenant_usage(
                tenant,
                Utc::now() - chrono::Duration::hours(1),
                Utc::now() + chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert!(history.len() <= 1);
    }

    #[tokio::test]
    async fn node_stat_upserts_node_fields() {
        let cache = fresh_cache().await;
        let node_id = NodeId::new();
        cache
            .handle_node_stat(NodeStatReport {
                node_id,
                hostname: "node-a".to_string(),
                memory_total_mb: 8192,
                memory_available_mb: 4096,
                cpu_load: 0.5,
                cpu_count: 4,
            })
            .await
            .unwrap();

        let _g = lock_order::enter(LockId::Nodes);
        let node = cache.nodes.read().get(&node_id).cloned().unwrap();
        assert_eq!(node.memory_available_mb, 4096);
    }
}
