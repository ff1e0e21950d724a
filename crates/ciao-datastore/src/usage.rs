//! Tenant usage history (spec §4.1 "UpdateTenantUsage", "Query usage
//! window", §8 "usage history timestamps are non-decreasing").

use crate::cache::DatastoreCache;
use crate::errors::{DatastoreError, DatastoreResult};
use crate::lock_order::{self, LockId};
use chrono::{DateTime, Utc};
use ciao_types::{TenantId, UsageSample};

impl DatastoreCache {
    /// Applies a `(cpu, memory, disk)` delta to the tenant's running usage
    /// total. A no-op when all three deltas are zero. Buckets consecutive
    /// updates within the configured window into one sample, preserving
    /// the original timestamp; otherwise appends a fresh sample.
    pub async fn update_tenant_usage(
        &self,
        tenant: TenantId,
        cpu_delta: i64,
        memory_delta: i64,
        disk_delta: i64,
    ) -> DatastoreResult<()> {
        if cpu_delta == 0 && memory_delta == 0 && disk_delta == 0 {
            return Ok(());
        }
        let now = Utc::now();
        let sample = {
            let _g = lock_order::enter(LockId::TenantUsage);
            let mut usage = self.tenant_usage.write();
            let history = usage.entry(tenant).or_default();
            match history.last_mut() {
                Some(last) if now - last.timestamp < self.usage_bucket => {
                    last.cpu += cpu_delta;
                    last.memory += memory_delta;
                    last.disk += disk_delta;
                    *last
                }
                Some(last) => {
                    let next = UsageSample {
                        cpu: last.cpu + cpu_delta,
                        memory: last.memory + memory_delta,
                        disk: last.disk + disk_delta,
                        timestamp: now,
                    };
                    history.push(next);
                    next
                }
                None => {
                    let next = UsageSample {
                        cpu: cpu_delta,
                        memory: memory_delta,
                        disk: disk_delta,
                        timestamp: now,
                    };
                    history.push(next);
                    next
                }
            }
        };
        self.store.append_usage_sample(tenant, sample).await?;
        Ok(())
    }

    /// Returns the slice of history samples with timestamps in
    /// `[start, end]`. Empty (not an error) when the tenant has history
    /// but none falls in range; errors only when the tenant has no
    /// history at all.
    pub async fn get_tenant_usage(
        &self,
        tenant: TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatastoreResult<Vec<UsageSample>> {
        let _g = lock_order::enter(LockId::TenantUsage);
        let usage = self.tenant_usage.read();
        let history = usage
            .get(&tenant)
            .ok_or_else(|| DatastoreError::not_found(format!("usage history for tenant {tenant}")))?;
        Ok(history
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .copied()
            .collect())
    }
}
