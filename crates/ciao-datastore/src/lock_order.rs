//! Debug-only lock-order assertions (spec §5 lock table).
//!
//! `tenantsLock ≺ instancesLock ≺ nodesLock`; `instanceLastStatLock` and
//! `tenantUsageLock` are leaves and must never be held while acquiring
//! another lock. Compiled out entirely in release builds; a violation here
//! is a bug in this crate, not something a caller can trigger.

#[cfg(debug_assertions)]
mod guard {
    use std::cell::RefCell;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LockId {
        Tenants = 0,
        Instances = 1,
        Nodes = 2,
        InstanceLastStat = 3,
        TenantUsage = 4,
        Workloads = 5,
        NodeLastStat = 6,
    }

    thread_local! {
        static HELD: RefCell<Vec<LockId>> = RefCell::new(Vec::new());
    }

    pub struct Acquisition(LockId);

    impl Drop for Acquisition {
        fn drop(&mut self) {
            HELD.with(|h| {
                let mut h = h.borrow_mut();
                if let Some(pos) = h.iter().rposition(|id| *id == self.0) {
                    h.remove(pos);
                }
            });
        }
    }

    /// Call immediately before taking the named lock. Returns a guard that
    /// records the release when dropped.
    pub fn enter(id: LockId) -> Acquisition {
        HELD.with(|h| {
            let held = h.borrow();
            let is_leaf = matches!(id, LockId::InstanceLastStat | LockId::TenantUsage);
            if is_leaf {
                assert!(
                    held.is_empty(),
                    "lock-order violation: {:?} is a leaf lock but {:?} are already held",
                    id,
                    *held
                );
            } else if let Some(last) = held.last() {
                assert!(
                    *last <= id,
                    "lock-order violation: acquiring {:?} while holding {:?}",
                    id,
                    *last
                );
            }
            drop(held);
            h.borrow_mut().push(id);
        });
        Acquisition(id)
    }
}

#[cfg(debug_assertions)]
pub use guard::{enter, LockId};

#[cfg(not(debug_assertions))]
pub enum LockId {
    Tenants,
    Instances,
    Nodes,
    InstanceLastStat,
    TenantUsage,
    Workloads,
    NodeLastStat,
}

#[cfg(not(debug_assertions))]
pub fn enter(_id: LockId) {}

#[cfg(all(test, debug_assertions))]
mod tests {
    use super::*;

    #[test]
    fn tenants_then_instances_is_fine() {
        let _t = enter(LockId::Tenants);
        let _i = enter(LockId::Instances);
    }

    #[test]
    #[should_panic(expected = "lock-order violation")]
    fn instances_then_tenants_panics() {
        let _i = enter(LockId::Instances);
        let _t = enter(LockId::Tenants);
    }

    #[test]
    #[should_panic(expected = "lock-order violation")]
    fn leaf_lock_while_holding_another_panics() {
        let _t = enter(LockId::Tenants);
        let _u = enter(LockId::TenantUsage);
    }
}
