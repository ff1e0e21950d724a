//! Tenant operations (spec §4.1 "Tenant operations").

use crate::cache::DatastoreCache;
use crate::errors::{DatastoreError, DatastoreResult};
use crate::lock_order::{self, LockId};
use ciao_types::{InstanceId, MacAddress, ResourceType, Tenant, TenantId};
use rand::Rng;
use std::net::Ipv4Addr;
use tracing::info;

/// Generates a CNCI MAC: byte 0 fixed to `0x02`, byte 1 in `[1, 255]`
/// (never `0x00`), bytes 2-5 random (spec §4.1 `AddTenant`, §6 MAC format).
fn generate_cnci_mac() -> MacAddress {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 6];
    bytes[0] = 0x02;
    bytes[1] = rng.gen_range(1..=255u16) as u8;
    for b in &mut bytes[2..] {
        *b = rng.gen();
    }
    MacAddress(bytes)
}

impl DatastoreCache {
    /// `AddTenant(id)`: generates a CNCI MAC, persists, re-reads, inserts
    /// into cache.
    pub async fn add_tenant(&self, id: TenantId, name: impl Into<String>) -> DatastoreResult<Tenant> {
        let mut tenant = Tenant::new(id, name);
        tenant.cnci_mac = Some(generate_cnci_mac());
        self.store.add_tenant(&tenant).await?;
        let persisted = self.store.get_tenant(id).await?;

        let _g = lock_order::enter(LockId::Tenants);
        let mut state = self.tenants.write();
        for subnet in &persisted.net.subnets {
            state.all_subnets.insert(*subnet);
        }
        state.tenants.insert(id, persisted.clone());
        Ok(persisted)
    }

    /// `GetTenant(id)`: cache hit returns immediately; miss falls through
    /// to the store. No negative caching.
    pub async fn get_tenant(&self, id: TenantId) -> DatastoreResult<Tenant> {
        {
            let _g = lock_order::enter(LockId::Tenants);
            if let Some(tenant) = self.tenants.read().tenants.get(&id) {
                return Ok(tenant.clone());
            }
        }
        let tenant = self
            .store
            .get_tenant(id)
            .await
            .map_err(|_| DatastoreError::not_found(format!("tenant {id}")))?;
        Ok(tenant)
    }

    /// `AddLimit(tenant, resourceType, limit)`: persist then update cache.
    pub async fn add_limit(
        &self,
        tenant: TenantId,
        resource_type: ResourceType,
        limit: i64,
    ) -> DatastoreResult<()> {
        self.store.add_limit(tenant, resource_type, limit).await?;
        let _g = lock_order::enter(LockId::Tenants);
        if let Some(t) = self.tenants.write().tenants.get_mut(&tenant) {
            t.resource_mut(resource_type).limit = limit;
        }
        Ok(())
    }

    /// `AddTenantCNCI`: associates a CNCI instance with its tenant.
    pub async fn add_tenant_cnci(
        &self,
        tenant: TenantId,
        cnci_instance_id: InstanceId,
    ) -> DatastoreResult<()> {
        let updated = {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            let t = state
                .tenants
                .get_mut(&tenant)
                .ok_or_else(|| DatastoreError::not_found(format!("tenant {tenant}")))?;
            t.cnci_instance_id = Some(cnci_instance_id);
            t.clone()
        };
        self.store.update_tenant(&updated).await?;
        Ok(())
    }

    /// `AddCNCIIP`: records the concentrator's IP and signals the CNCI
    /// channel for this tenant with `true` (spec §4.1, §4.4).
    pub async fn add_cnci_ip(&self, tenant: TenantId, ip: Ipv4Addr) -> DatastoreResult<()> {
        let updated = {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            let t = state
                .tenants
                .get_mut(&tenant)
                .ok_or_else(|| DatastoreError::not_found(format!("tenant {tenant}")))?;
            t.cnci_ip = Some(ip);
            t.clone()
        };
        self.store.update_tenant(&updated).await?;
        self.cnci().fulfil(tenant, true);
        Ok(())
    }

    /// `removeTenantCNCI`: clears the CNCI association without touching
    /// the CNCI channel (used outside the failure path, e.g. explicit
    /// teardown).
    pub async fn remove_tenant_cnci(&self, tenant: TenantId) -> DatastoreResult<()> {
        let updated = {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            let t = state
                .tenants
                .get_mut(&tenant)
                .ok_or_else(|| DatastoreError::not_found(format!("tenant {tenant}")))?;
            t.cnci_instance_id = None;
            t.cnci_mac = None;
            t.cnci_ip = None;
            t.clone()
        };
        self.store.update_tenant(&updated).await?;
        info!(%tenant, "CNCI association removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc;

    #[test]
    fn generated_mac_is_valid_cnci_mac() {
        for _ in 0..100 {
            let mac = generate_cnci_mac();
            assert!(mac.is_valid_cnci_mac());
        }
    }

    #[tokio::test]
    async fn add_tenant_then_get_tenant_round_trips() {
        let store = Arc::new(InMemoryStore::new());
        let cache = DatastoreCache::load(store, 5).await.unwrap();
        let id = TenantId::new();
        cache.add_tenant(id, "acme").await.unwrap();
        let tenant = cache.get_tenant(id).await.unwrap();
        assert_eq!(tenant.name, "acme");
        assert!(tenant.cnci_mac.unwrap().is_valid_cnci_mac());
    }

    #[tokio::test]
    async fn add_limit_updates_cached_resource() {
        let store = Arc::new(InMemoryStore::new());
        let cache = DatastoreCache::load(store, 5).await.unwrap();
        let id = TenantId::new();
        cache.add_tenant(id, "acme").await.unwrap();
        cache.add_limit(id, ResourceType::Instances, 5).await.unwrap();
        let tenant = cache.get_tenant(id).await.unwrap();
        let counter = tenant
            .resources
            .iter()
            .find(|r| r.resource_type == ResourceType::Instances)
            .unwrap();
        assert_eq!(counter.limit, 5);
    }

    #[tokio::test]
    async fn add_cnci_ip_fulfils_registered_signal() {
        let store = Arc::new(InMemoryStore::new());
        let cache = DatastoreCache::load(store, 5).await.unwrap();
        let id = TenantId::new();
        cache.add_tenant(id, "acme").await.unwrap();
        let rx = cache.cnci().register(id);
        cache.add_cnci_ip(id, Ipv4Addr::new(172, 16, 0, 3)).await.unwrap();
        assert!(rx.await.unwrap());
    }
}
