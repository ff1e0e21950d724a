//! The Datastore Cache (spec §4.1): an in-memory, write-through cache over
//! a [`PersistentStore`].

use crate::lock_order::{self, LockId};
use ciao_types::{
    Instance, InstanceId, Node, NodeId, NodeKind, PersistentStore, Tenant, TenantId, UsageSample,
    Workload, WorkloadId,
};
use ciao_types::net::SubnetIndex;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cnci::CnciCoordinator;
use crate::errors::DatastoreResult;

/// A synthetic or reported instance stat snapshot, kept to compute usage
/// deltas on the next report (spec §4.1 "Stats ingestion").
#[derive(Debug, Clone, Copy)]
pub struct InstanceStatSnapshot {
    pub cpu: i64,
    pub memory: i64,
    pub disk: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Process-wide view of claimed subnets plus the tenant map, guarded by a
/// single lock (spec §5: "tenantsLock | tenants map, allSubnets set,
/// per-tenant resource and network maps").
#[derive(Default)]
pub(crate) struct TenantsState {
    pub tenants: HashMap<TenantId, Tenant>,
    pub all_subnets: HashSet<SubnetIndex>,
}

pub struct DatastoreCache {
    pub(crate) store: Arc<dyn PersistentStore>,
    pub(crate) tenants: RwLock<TenantsState>,
    pub(crate) instances: RwLock<HashMap<InstanceId, Instance>>,
    pub(crate) instance_last_stat: RwLock<HashMap<InstanceId, InstanceStatSnapshot>>,
    pub(crate) nodes: RwLock<HashMap<NodeId, Node>>,
    pub(crate) tenant_usage: RwLock<HashMap<TenantId, Vec<UsageSample>>>,
    pub(crate) workloads: RwLock<HashMap<WorkloadId, Workload>>,
    pub(crate) cnci_workload_id: RwLock<Option<WorkloadId>>,
    pub(crate) cnci: CnciCoordinator,
    pub(crate) usage_bucket: chrono::Duration,
}

impl DatastoreCache {
    /// Opens the store and loads every map the cache needs (spec §4.1
    /// "Initialization").
    pub async fn load(
        store: Arc<dyn PersistentStore>,
        usage_bucket_minutes: i64,
    ) -> DatastoreResult<Self> {
        let instances = store.list_instances().await?;
        let tenants_vec = store.get_all_tenants().await?;
        let workloads_vec = store.get_all_workloads().await?;
        let cnci_workload_id = store.get_cnci_workload_id().await.ok();

        let mut tenants = HashMap::with_capacity(tenants_vec.len());
        let mut all_subnets = HashSet::new();
        for tenant in tenants_vec {
            for subnet in &tenant.net.subnets {
                all_subnets.insert(*subnet);
            }
            tenants.insert(tenant.id, tenant);
        }

        let mut nodes: HashMap<NodeId, Node> = HashMap::new();
        let mut instance_map = HashMap::with_capacity(instances.len());
        for instance in instances {
            if let Some(node_id) = instance.node_id {
                let node = nodes
                    .entry(node_id)
                    .or_insert_with(|| Node::new_compute(node_id, ""));
                if let NodeKind::Compute { instances } = &mut node.kind {
                    instances.insert(instance.id);
                }
            }
            instance_map.insert(instance.id, instance);
        }

        let mut workloads = HashMap::with_capacity(workloads_vec.len());
        for workload in workloads_vec {
            workloads.insert(workload.id, workload);
        }

        info!(
            tenants = tenants.len(),
            instances = instance_map.len(),
            nodes = nodes.len(),
            workloads = workloads.len(),
            "datastore cache loaded"
        );

        Ok(Self {
            store,
            tenants: RwLock::new(TenantsState {
                tenants,
                all_subnets,
            }),
            instances: RwLock::new(instance_map),
            instance_last_stat: RwLock::new(HashMap::new()),
            nodes: RwLock::new(nodes),
            tenant_usage: RwLock::new(HashMap::new()),
            workloads: RwLock::new(workloads),
            cnci_workload_id: RwLock::new(cnci_workload_id),
            cnci: CnciCoordinator::new(),
            usage_bucket: chrono::Duration::minutes(usage_bucket_minutes),
        })
    }

    pub fn cnci(&self) -> &CnciCoordinator {
        &self.cnci
    }

    pub fn cnci_workload_id(&self) -> Option<WorkloadId> {
        *self.cnci_workload_id.read()
    }

    pub fn get_workload(&self, id: WorkloadId) -> Option<Workload> {
        let _g = lock_order::enter(LockId::Workloads);
        self.workloads.read().get(&id).cloned()
    }

    /// Spawns best-effort persistence and logs on failure without rolling
    /// back the already-applied cache mutation (spec §4.1 "Failure
    /// policy"). Retries with the crate-standard backoff policy before
    /// giving up, since a background task has no caller to report to.
    pub(crate) fn spawn_persist<F, Fut>(&self, what: &'static str, make_attempt: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = DatastoreResult<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            let policy = ciao_utils::RetryPolicy::default();
            let result = policy
                .execute(|| async { make_attempt().await.map_err(|e| e.to_string()) })
                .await;
            if let Err(err) = result {
                warn!(what, error = %err, "background persist failed after retries");
            }
        });
    }
}
