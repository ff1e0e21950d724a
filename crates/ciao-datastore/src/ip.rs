//! Tenant IP/subnet allocation (spec §4.1 "IP allocation (critical
//! algorithm)", §8 boundary tests).

use crate::cache::DatastoreCache;
use crate::errors::{DatastoreError, DatastoreResult};
use crate::lock_order::{self, LockId};
use ciao_types::net::{parse_tenant_ip, SubnetIndex, HOSTS_PER_SUBNET, HOST_MAX, HOST_MIN};
use ciao_types::TenantId;
use std::net::Ipv4Addr;

/// Subnet search starts at `{16, 0}` and must not exceed `{31, 255}`
/// (spec §4.1 step 2, §8 "Subnet allocation exhausts at (31, 255)").
const SEARCH_START: SubnetIndex = SubnetIndex(0x1000);
const SEARCH_CEILING: SubnetIndex = SubnetIndex(0x1FFF);

impl DatastoreCache {
    /// Allocates the next free `172.<hi>.<lo>.<host>` address for `tenant`
    /// following the five-step algorithm in spec §4.1.
    pub async fn allocate_tenant_ip(&self, tenant: TenantId) -> DatastoreResult<Ipv4Addr> {
        let (subnet, host) = {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();

            let newly_claimed_subnet;
            let subnet = {
                let all_subnets = state.all_subnets.clone();
                let t = state
                    .tenants
                    .get(&tenant)
                    .ok_or_else(|| DatastoreError::not_found(format!("tenant {tenant}")))?;

                let mut existing: Vec<SubnetIndex> = t.net.subnets.clone();
                existing.sort_by_key(|s| s.0);
                let with_capacity = existing
                    .into_iter()
                    .rev()
                    .find(|s| {
                        t.net
                            .network
                            .get(s)
                            .map(|hosts| (hosts.len() as u32) < HOSTS_PER_SUBNET)
                            .unwrap_or(true)
                    });

                if let Some(s) = with_capacity {
                    newly_claimed_subnet = false;
                    s
                } else {
                    newly_claimed_subnet = true;
                    let mut candidate = SEARCH_START;
                    loop {
                        if candidate.0 > SEARCH_CEILING.0 {
                            return Err(DatastoreError::ResourceExhausted(
                                "out of subnets".to_string(),
                            ));
                        }
                        if !all_subnets.contains(&candidate) {
                            break candidate;
                        }
                        candidate = SubnetIndex(candidate.0 + 1);
                    }
                }
            };

            if newly_claimed_subnet {
                state.all_subnets.insert(subnet);
            }
            let t = state.tenants.get_mut(&tenant).unwrap();
            if newly_claimed_subnet {
                t.net.subnets.push(subnet);
            }
            let hosts = t.net.network.entry(subnet).or_default();
            let mut host = HOST_MIN;
            loop {
                if host > HOST_MAX {
                    return Err(DatastoreError::ResourceExhausted(
                        "subnet has no free host byte".to_string(),
                    ));
                }
                if !hosts.contains(&host) {
                    break;
                }
                host += 1;
            }
            hosts.insert(host);
            (subnet, host)
        };

        let store = self.store.clone();
        self.spawn_persist("claim_tenant_ip", move || {
            let store = store.clone();
            async move {
                store.claim_tenant_ip(tenant, subnet, host).await?;
                Ok(())
            }
        });

        Ok(subnet.to_ip(host))
    }

    /// Releases a previously allocated address. Persisted synchronously
    /// (spec §4.1 "IP release").
    pub async fn release_tenant_ip(&self, tenant: TenantId, ip: Ipv4Addr) -> DatastoreResult<()> {
        let (subnet, host) = parse_tenant_ip(ip)
            .ok_or_else(|| DatastoreError::InvalidPayload(format!("{ip} is not a tenant address")))?;
        {
            let _g = lock_order::enter(LockId::Tenants);
            let mut state = self.tenants.write();
            if let Some(t) = state.tenants.get_mut(&tenant) {
                if let Some(hosts) = t.net.network.get_mut(&subnet) {
                    hosts.remove(&host);
                }
            }
        }
        self.store.release_tenant_ip(tenant, subnet, host).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn fresh_tenant() -> (Arc<DatastoreCache>, TenantId) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(DatastoreCache::load(store, 5).await.unwrap());
        let id = TenantId::new();
        cache.add_tenant(id, "acme").await.unwrap();
        (cache, id)
    }

    #[tokio::test]
    async fn allocate_then_release_restores_prior_state() {
        let (cache, tenant) = fresh_tenant().await;
        let before: HashSet<u8> = HashSet::new();
        let ip = cache.allocate_tenant_ip(tenant).await.unwrap();
        cache.release_tenant_ip(tenant, ip).await.unwrap();

        let state = cache.tenants.read();
        let t = &state.tenants[&tenant];
        let hosts = t.net.network.values().next().cloned().unwrap_or_default();
        assert_eq!(hosts, before);
    }

    #[tokio::test]
    async fn two_hundred_fifty_four_allocations_yields_two_subnets() {
        let (cache, tenant) = fresh_tenant().await;
        for _ in 0..254 {
            cache.allocate_tenant_ip(tenant).await.unwrap();
        }
        let state = cache.tenants.read();
        let t = &state.tenants[&tenant];
        assert_eq!(t.net.subnets.len(), 2);
        let sizes: Vec<usize> = t
            .net
            .subnets
            .iter()
            .map(|s| t.net.network[s].len())
            .collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 253]);
    }

    #[tokio::test]
    async fn two_fresh_tenants_get_disjoint_subnets() {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(DatastoreCache::load(store, 5).await.unwrap());
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        cache.add_tenant(t1, "one").await.unwrap();
        cache.add_tenant(t2, "two").await.unwrap();
        let ip1 = cache.allocate_tenant_ip(t1).await.unwrap();
        let ip2 = cache.allocate_tenant_ip(t2).await.unwrap();
        let (s1, _) = parse_tenant_ip(ip1).unwrap();
        let (s2, _) = parse_tenant_ip(ip2).unwrap();
        assert_ne!(s1, s2);
    }

    #[tokio::test]
    async fn release_of_unknown_address_format_is_invalid_payload() {
        let (cache, tenant) = fresh_tenant().await;
        let err = cache
            .release_tenant_ip(tenant, Ipv4Addr::new(10, 0, 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DatastoreError::InvalidPayload(_)));
    }
}
