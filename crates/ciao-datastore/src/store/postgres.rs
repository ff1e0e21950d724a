//! PostgreSQL-backed [`PersistentStore`].
//!
//! Stores each domain entity as a JSONB blob keyed by its id, an
//! anti-corruption-layer pattern: avoid hand-maintaining a column per
//! field, let `serde` own the shape, and only break out columns needed for
//! indexing or ordering (tenant id on usage/events, node id on
//! instance/frame stats).
//!
//! ```sql
//! CREATE TABLE tenants (id TEXT PRIMARY KEY, data JSONB NOT NULL);
//! CREATE TABLE instances (id TEXT PRIMARY KEY, node_id TEXT, data JSONB NOT NULL);
//! CREATE TABLE workloads (id TEXT PRIMARY KEY, data JSONB NOT NULL);
//! CREATE TABLE cnci_workload (id TEXT PRIMARY KEY, workload_id TEXT NOT NULL);
//! CREATE TABLE usage_samples (tenant_id TEXT NOT NULL, ts TIMESTAMPTZ NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE event_log (tenant_id TEXT NOT NULL, ts TIMESTAMPTZ NOT NULL, level TEXT NOT NULL, message TEXT NOT NULL);
//! CREATE TABLE node_stats (node_id TEXT PRIMARY KEY, data JSONB NOT NULL);
//! CREATE TABLE frame_stats (node_id TEXT NOT NULL, frame_type TEXT NOT NULL, recorded_at TIMESTAMPTZ NOT NULL);
//! ```

use async_trait::async_trait;
use ciao_types::net::SubnetIndex;
use ciao_types::store::{FrameBatchSummary, FrameStat, NodeSummary};
use ciao_types::{
    CiaoError, CiaoResult, EventLevel, EventLogEntry, Instance, InstanceId, Node, NodeId,
    PersistentStore, ResourceType, Tenant, TenantId, UsageSample, Workload, WorkloadId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{info, instrument};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects a bounded pool against `dsn`. Schema migration is the
    /// deploying operator's responsibility (out of scope, spec §1).
    #[instrument(skip(dsn))]
    pub async fn connect(dsn: &str) -> sqlx::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(dsn)
            .await?;
        info!("connected to postgres datastore");
        Ok(Self { pool })
    }

    fn map_sqlx(err: sqlx::Error) -> CiaoError {
        match err {
            sqlx::Error::RowNotFound => CiaoError::NotFound("row not found".to_string()),
            other => CiaoError::Persistence(other.to_string()),
        }
    }
}

fn to_json(value: &impl serde::Serialize) -> CiaoResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CiaoError::InvalidPayload(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> CiaoResult<T> {
    serde_json::from_value(value).map_err(|e| CiaoError::Persistence(e.to_string()))
}

#[async_trait]
impl PersistentStore for PostgresStore {
    async fn disconnect(&self) -> CiaoResult<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn add_tenant(&self, tenant: &Tenant) -> CiaoResult<()> {
        let data = to_json(tenant)?;
        sqlx::query("INSERT INTO tenants (id, data) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data")
            .bind(tenant.id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn get_tenant(&self, id: TenantId) -> CiaoResult<Tenant> {
        let row = sqlx::query("SELECT data FROM tenants WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx)?
            .ok_or_else(|| CiaoError::not_found(format!("tenant {id}")))?;
        from_json(row.get("data"))
    }

    async fn get_all_tenants(&self) -> CiaoResult<Vec<Tenant>> {
        let rows = sqlx::query("SELECT data FROM tenants")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        rows.into_iter().map(|r| from_json(r.get("data"))).collect()
    }

    async fn update_tenant(&self, tenant: &Tenant) -> CiaoResult<()> {
        self.add_tenant(tenant).await
    }

    async fn delete_tenant(&self, id: TenantId) -> CiaoResult<()> {
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn add_limit(
        &self,
        tenant: TenantId,
        resource_type: ResourceType,
        limit: i64,
    ) -> CiaoResult<()> {
        let mut t = self.get_tenant(tenant).await?;
        t.resource_mut(resource_type).limit = limit;
        self.update_tenant(&t).await
    }

    async fn claim_tenant_ip(&self, tenant: TenantId, subnet: SubnetIndex, host: u8) -> CiaoResult<()> {
        let mut t = self.get_tenant(tenant).await?;
        if !t.net.network.contains_key(&subnet) {
            t.net.subnets.push(subnet);
        }
        t.net.network.entry(subnet).or_default().insert(host);
        self.update_tenant(&t).await
    }

    async fn release_tenant_ip(&self, tenant: TenantId, subnet: SubnetIndex, host: u8) -> CiaoResult<()> {
        let mut t = self.get_tenant(tenant).await?;
        if let Some(hosts) = t.net.network.get_mut(&subnet) {
            hosts.remove(&host);
        }
        self.update_tenant(&t).await
    }

    async fn add_instance(&self, instance: &Instance) -> CiaoResult<()> {
        let data = to_json(instance)?;
        sqlx::query(
            "INSERT INTO instances (id, node_id, data) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET node_id = EXCLUDED.node_id, data = EXCLUDED.data",
        )
        .bind(instance.id.to_string())
        .bind(instance.node_id.map(|n| n.to_string()))
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn list_instances(&self) -> CiaoResult<Vec<Instance>> {
        let rows = sqlx::query("SELECT data FROM instances")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        rows.into_iter().map(|r| from_json(r.get("data"))).collect()
    }

    async fn remove_instance(&self, id: InstanceId) -> CiaoResult<()> {
        sqlx::query("DELETE FROM instances WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn delete_usage(&self, instance: InstanceId) -> CiaoResult<()> {
        let _ = instance;
        Ok(())
    }

    async fn add_node_stat(&self, node: &Node) -> CiaoResult<()> {
        let data = to_json(node)?;
        sqlx::query(
            "INSERT INTO node_stats (node_id, data) VALUES ($1, $2) \
             ON CONFLICT (node_id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(node.id.to_string())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn add_instance_stats(&self, instances: &[Instance], node_id: NodeId) -> CiaoResult<()> {
        for instance in instances {
            self.add_instance(instance).await?;
        }
        let _ = node_id;
        Ok(())
    }

    async fn add_frame_stat(&self, stat: FrameStat) -> CiaoResult<()> {
        sqlx::query("INSERT INTO frame_stats (node_id, frame_type, recorded_at) VALUES ($1, $2, $3)")
            .bind(stat.node_id.to_string())
            .bind(stat.frame_type)
            .bind(stat.recorded_at)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn get_batch_frame_summary(&self, label: &str) -> CiaoResult<FrameBatchSummary> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count, MIN(recorded_at) AS first, MAX(recorded_at) AS last \
             FROM frame_stats WHERE frame_type = $1",
        )
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx)?;
        let count: i64 = row.get("count");
        Ok(FrameBatchSummary {
            label: label.to_string(),
            count: count as u64,
            first: row.get("first"),
            last: row.get("last"),
        })
    }

    async fn get_node_summary(&self, node_id: NodeId) -> CiaoResult<NodeSummary> {
        let row = sqlx::query("SELECT data FROM node_stats WHERE node_id = $1")
            .bind(node_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx)?
            .ok_or_else(|| CiaoError::not_found(format!("node {node_id}")))?;
        let node: Node = from_json(row.get("data"))?;
        let count_row = sqlx::query("SELECT COUNT(*) AS count FROM instances WHERE node_id = $1")
            .bind(node_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        let instance_count: i64 = count_row.get("count");
        Ok(NodeSummary {
            node_id,
            memory_total_mb: node.memory_total_mb,
            memory_available_mb: node.memory_available_mb,
            cpu_load: node.cpu_load,
            instance_count: instance_count as u64,
        })
    }

    async fn append_usage_sample(&self, tenant: TenantId, sample: UsageSample) -> CiaoResult<()> {
        let data = to_json(&sample)?;
        sqlx::query("INSERT INTO usage_samples (tenant_id, ts, data) VALUES ($1, $2, $3)")
            .bind(tenant.to_string())
            .bind(sample.timestamp)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn get_usage_history(&self, tenant: TenantId) -> CiaoResult<Vec<UsageSample>> {
        let rows = sqlx::query("SELECT data FROM usage_samples WHERE tenant_id = $1 ORDER BY ts ASC")
            .bind(tenant.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        if rows.is_empty() {
            return Err(CiaoError::not_found(format!("usage history for tenant {tenant}")));
        }
        rows.into_iter().map(|r| from_json(r.get("data"))).collect()
    }

    async fn log_event(&self, entry: EventLogEntry) -> CiaoResult<()> {
        let level = match entry.level {
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
        };
        sqlx::query("INSERT INTO event_log (tenant_id, ts, level, message) VALUES ($1, $2, $3, $4)")
            .bind(entry.tenant_id.to_string())
            .bind(entry.timestamp)
            .bind(level)
            .bind(entry.message)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn clear_events(&self, tenant: TenantId) -> CiaoResult<()> {
        sqlx::query("DELETE FROM event_log WHERE tenant_id = $1")
            .bind(tenant.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(())
    }

    async fn get_events(&self, tenant: TenantId) -> CiaoResult<Vec<EventLogEntry>> {
        let rows = sqlx::query("SELECT ts, level, message FROM event_log WHERE tenant_id = $1 ORDER BY ts ASC")
            .bind(tenant.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let level_str: String = r.get("level");
                let level = match level_str.as_str() {
                    "warn" => EventLevel::Warn,
                    "error" => EventLevel::Error,
                    _ => EventLevel::Info,
                };
                EventLogEntry {
                    timestamp: r.get("ts"),
                    tenant_id: tenant,
                    level,
                    message: r.get("message"),
                }
            })
            .collect())
    }

    async fn get_cnci_workload_id(&self) -> CiaoResult<WorkloadId> {
        let row = sqlx::query("SELECT workload_id FROM cnci_workload LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx)?
            .ok_or_else(|| CiaoError::not_found("no CNCI workload configured"))?;
        let id: String = row.get("workload_id");
        id.parse()
            .map_err(|_| CiaoError::Persistence("malformed CNCI workload id".to_string()))
    }

    async fn get_workload(&self, id: WorkloadId) -> CiaoResult<Workload> {
        let row = sqlx::query("SELECT data FROM workloads WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx)?
            .ok_or_else(|| CiaoError::not_found(format!("workload {id}")))?;
        from_json(row.get("data"))
    }

    async fn get_all_workloads(&self) -> CiaoResult<Vec<Workload>> {
        let rows = sqlx::query("SELECT data FROM workloads")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx)?;
        rows.into_iter().map(|r| from_json(r.get("data"))).collect()
    }
}
