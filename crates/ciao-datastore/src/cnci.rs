//! CNCI completion signals (spec §3 "CNCI channel map", §4.4).
//!
//! A tenant id maps to a one-shot boolean signal registered by whichever
//! caller issued the CNCI START and is waiting to learn whether the
//! concentrator came up. At most one delivery per registration; delivery
//! removes the entry.

use ciao_types::TenantId;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Default)]
pub struct CnciCoordinator {
    channels: DashMap<TenantId, oneshot::Sender<bool>>,
}

impl CnciCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a completion signal for `tenant`, returning the receiver
    /// half. Overwrites (and silently drops) any prior unfulfilled signal
    /// for the same tenant.
    pub fn register(&self, tenant: TenantId) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        self.channels.insert(tenant, tx);
        rx
    }

    /// Delivers `outcome` to the registered signal for `tenant`, if any, and
    /// removes it. A missing or already-drained signal is not an error: the
    /// send must never block or fail the caller (spec §5 "Suspension and
    /// blocking").
    pub fn fulfil(&self, tenant: TenantId, outcome: bool) {
        if let Some((_, tx)) = self.channels.remove(&tenant) {
            // Receiver may already be gone if the waiter timed out; ignore.
            let _ = tx.send(outcome);
        } else {
            debug!(%tenant, "no CNCI signal registered for tenant");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_true_to_registered_waiter() {
        let coord = CnciCoordinator::new();
        let tenant = TenantId::new();
        let rx = coord.register(tenant);
        coord.fulfil(tenant, true);
        assert_eq!(rx.await.unwrap(), true);
    }

    #[tokio::test]
    async fn fulfil_without_registration_does_not_panic() {
        let coord = CnciCoordinator::new();
        coord.fulfil(TenantId::new(), false);
    }

    #[tokio::test]
    async fn delivery_removes_the_entry() {
        let coord = CnciCoordinator::new();
        let tenant = TenantId::new();
        let _rx = coord.register(tenant);
        coord.fulfil(tenant, true);
        assert!(coord.channels.get(&tenant).is_none());
    }
}
