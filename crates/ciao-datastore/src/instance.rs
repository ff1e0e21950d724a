//! Instance operations (spec §4.1 "Instance operations").

use crate::cache::{DatastoreCache, InstanceStatSnapshot};
use crate::errors::{DatastoreError, DatastoreResult};
use crate::lock_order::{self, LockId};
use chrono::Utc;
use ciao_types::{EventLevel, EventLogEntry, FailureReason, Instance, InstanceId, NodeKind, ResourceType};
use tracing::{error, info};

impl DatastoreCache {
    /// `AddInstance(i)`: checks every affected resource counter against its
    /// limit, rejecting pre-persist on the first one that would be exceeded
    /// (spec §7 "caller's action is rejected pre-persist"); on success,
    /// inserts into the instance cache, records a synthetic initial stat,
    /// applies the resource deltas and bumps the instances counter for the
    /// owning tenant, then persists.
    pub async fn add_instance(&self, instance: Instance) -> DatastoreResult<()> {
        {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            if let Some(t) = state.tenants.get_mut(&instance.tenant_id) {
                for (&resource_type, &delta) in &instance.usage {
                    let counter = t.resource_mut(resource_type);
                    if counter.would_exceed(delta) {
                        return Err(DatastoreError::QuotaExceeded {
                            resource: format!("{resource_type:?}"),
                            limit: counter.limit,
                            current: counter.usage,
                        });
                    }
                }
                let instances_counter = t.resource_mut(ResourceType::Instances);
                if instances_counter.would_exceed(1) {
                    return Err(DatastoreError::QuotaExceeded {
                        resource: format!("{:?}", ResourceType::Instances),
                        limit: instances_counter.limit,
                        current: instances_counter.usage,
                    });
                }

                for (&resource_type, &delta) in &instance.usage {
                    t.resource_mut(resource_type).usage += delta;
                }
                t.resource_mut(ResourceType::Instances).usage += 1;
                t.instances.insert(instance.id);
            }
        }
        {
            let _g = lock_order::enter(LockId::Instances);
            self.instances.write().insert(instance.id, instance.clone());
        }
        {
            let _g = lock_order::enter(LockId::InstanceLastStat);
            self.instance_last_stat.write().insert(
                instance.id,
                InstanceStatSnapshot {
                    cpu: 0,
                    memory: 0,
                    disk: 0,
                    recorded_at: Utc::now(),
                },
            );
        }
        self.store.add_instance(&instance).await?;
        Ok(())
    }

    /// `DeleteInstance(id)`: tears the instance down across every index,
    /// reverses its resource usage, releases its IP, and logs a
    /// user-facing event.
    pub async fn delete_instance(&self, id: InstanceId) -> DatastoreResult<()> {
        {
            let _g = lock_order::enter(LockId::InstanceLastStat);
            self.instance_last_stat.write().remove(&id);
        }
        let instance = {
            let _g = lock_order::enter(LockId::Instances);
            self.instances
                .write()
                .remove(&id)
                .ok_or_else(|| DatastoreError::not_found(format!("instance {id}")))?
        };
        if let Some(node_id) = instance.node_id {
            let _g = lock_order::enter(LockId::Nodes);
            if let Some(node) = self.nodes.write().get_mut(&node_id) {
                if let NodeKind::Compute { instances } = &mut node.kind {
                    instances.remove(&id);
                }
            }
        }
        {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            if let Some(t) = state.tenants.get_mut(&instance.tenant_id) {
                for (&resource_type, &delta) in &instance.usage {
                    t.resource_mut(resource_type).usage -= delta;
                }
                t.resource_mut(ResourceType::Instances).usage -= 1;
                t.instances.remove(&id);
            }
        }
        self.store.remove_instance(id).await?;
        if let Some(ip) = instance.ip {
            // Best-effort: release failures don't block the teardown.
            if let Err(err) = self.release_tenant_ip(instance.tenant_id, ip).await {
                error!(%id, error = %err, "failed to release instance IP on delete");
            }
        }
        self.log_user_event(
            instance.tenant_id,
            EventLevel::Info,
            format!("instance {id} deleted"),
        )
        .await;
        Ok(())
    }

    /// `StartFailure(id, reason)` (spec §4.1, §8 "StartFailure with a
    /// fatal reason is equivalent to DeleteInstance").
    pub async fn start_failure(&self, id: InstanceId, reason: FailureReason) -> DatastoreResult<()> {
        let (is_cnci, tenant_id) = {
            let _g = lock_order::enter(LockId::Instances);
            match self.instances.read().get(&id) {
                Some(i) => (i.cnci, Some(i.tenant_id)),
                None => (false, None),
            }
        };

        if is_cnci {
            if let Some(tenant_id) = tenant_id {
                self.remove_tenant_cnci(tenant_id).await.ok();
                self.log_user_event(
                    tenant_id,
                    EventLevel::Error,
                    format!("CNCI instance {id} failed to start: {reason:?}"),
                )
                .await;
                self.cnci().fulfil(tenant_id, false);
            }
            return Ok(());
        }

        if reason.is_fatal() {
            return self.delete_instance(id).await;
        }

        // LaunchFailure, AlreadyRunning, InstanceExists: leave the instance
        // in place, only log. Whether this is deliberate or a missed
        // cleanup path is an open question upstream; this mirrors it.
        if let Some(tenant_id) = tenant_id {
            self.log_user_event(
                tenant_id,
                EventLevel::Error,
                format!("instance {id} start failure: {reason:?}"),
            )
            .await;
        }
        Ok(())
    }

    /// `RestartFailure`/`StopFailure`: log an error event keyed by the
    /// instance's tenant; the instance itself is left untouched.
    pub async fn restart_failure(&self, id: InstanceId, message: impl Into<String>) -> DatastoreResult<()> {
        self.log_command_failure(id, "restart", message).await
    }

    pub async fn stop_failure(&self, id: InstanceId, message: impl Into<String>) -> DatastoreResult<()> {
        self.log_command_failure(id, "stop", message).await
    }

    async fn log_command_failure(
        &self,
        id: InstanceId,
        verb: &str,
        message: impl Into<String>,
    ) -> DatastoreResult<()> {
        let tenant_id = {
            let _g = lock_order::enter(LockId::Instances);
            self.instances.read().get(&id).map(|i| i.tenant_id)
        };
        if let Some(tenant_id) = tenant_id {
            self.log_user_event(
                tenant_id,
                EventLevel::Error,
                format!("instance {id} {verb} failure: {}", message.into()),
            )
            .await;
        }
        Ok(())
    }

    pub(crate) async fn log_user_event(&self, tenant_id: ciao_types::TenantId, level: EventLevel, message: String) {
        let entry = EventLogEntry {
            timestamp: Utc::now(),
            tenant_id,
            level,
            message,
        };
        if let Err(err) = self.store.log_event(entry).await {
            error!(%tenant_id, error = %err, "failed to persist event log entry");
        } else {
            info!(%tenant_id, "event logged");
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
    async fn add_then_delete_instance_restores_tenant_counters() {
        let cache = fresh_cache().await;
        let tenant = ciao_types::TenantId::new();
        cache.add_tenant(tenant, "acme").await.unwrap();
        let before = cache.get_tenant(tenant).await.unwrap().resources;

        let instance = InstanceBuilder::new().tenant(tenant).build();
        let id = instance.id;
        cache.add_instance(instance).await.unwrap();
        cache.delete_instance(id).await.unwrap();

        let after = cache.get_tenant(tenant).await.unwrap().resources;
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.usage, a.usage);
        }
    }

    #[tokio::test]
    async fn start_failure_with_fatal_reason_removes_instance() {
        let cache = fresh_cache().await;
        let tenant = ciao_types::TenantId::new();
        cache.add_tenant(tenant, "acme").await.unwrap();
        let instance = InstanceBuilder::new().tenant(tenant).build();
        let id = instance.id;
        cache.add_instance(instance).await.unwrap();

        cache.start_failure(id, FailureReason::FullCloud).await.unwrap();

        let _g = lock_order::enter(LockId::Instances);
        assert!(cache.instances.read().get(&id).is_none());
    }

    #[tokio::test]
    async fn add_instance_rejects_when_it_would_exceed_a_tenant_quota() {
        let cache = fresh_cache().await;
        let tenant = ciao_types::TenantId::new();
        cache.add_tenant(tenant, "acme").await.unwrap();
        cache
            .add_limit(tenant, ciao_types::ResourceType::Instances, 0)
            .await
            .unwrap();

        let instance = InstanceBuilder::new().tenant(tenant).build();
        let id = instance.id;
        let err = cache.add_instance(instance).await.unwrap_err();
        assert!(matches!(err, DatastoreError::QuotaExceeded { .. }));

        let _g = lock_order::enter(LockId::Instances);
        assert!(cache.instances.read().get(&id).is_none());
    }

    #[tokio::test]
    async fn start_failure_with_non_fatal_reason_leaves_instance_in_cache() {
        let cache = fresh_cache().await;
        let tenant = ciao_types::TenantId::new();
        cache.add_tenant(tenant, "acme").await.unwrap();
        let instance = InstanceBuilder::new().tenant(tenant).build();
        let id = instance.id;
        cache.add_instance(instance).await.unwrap();

        cache
            .start_failure(id, FailureReason::AlreadyRunning)
            .await
            .unwrap();

        assert!(cache.instances.read().get(&id).is_some());
    }
}
