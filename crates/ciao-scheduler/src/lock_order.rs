//! Debug-only lock-order assertions (spec §5 lock table).
//!
//! `controllerMutex ≺ cnMutex ≺ nnMutex`. Compiled out entirely in release
//! builds; a violation here is a bug in this crate, not something a caller
//! can trigger. Per-node and per-controller field mutexes from the lock
//! table collapse into the registry-level lock here, the same way
//! `ciao-datastore` models `nodesLock` as one `RwLock<HashMap<..>>` rather
//! than a lock per node.

#[cfg(debug_assertions)]
mod guard {
    use std::cell::RefCell;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LockId {
        Controllers = 0,
        Compute = 1,
        Network = 2,
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

    pub fn enter(id: LockId) -> Acquisition {
        HELD.with(|h| {
            let held = h.borrow();
            if let Some(last) = held.last() {
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
    Controllers,
    Compute,
    Network,
}

#[cfg(not(debug_assertions))]
pub fn enter(_id: LockId) {}

#[cfg(all(test, debug_assertions))]
mod tests {
    use super::*;

    #[test]
    fn controllers_then_compute_then_network_is_fine() {
        let _c = enter(LockId::Controllers);
        let _n = enter(LockId::Compute);
        let _nn = enter(LockId::Network);
    }

    #[test]
    #[should_panic(expected = "lock-order violation")]
    fn network_then_controllers_panics() {
        let _nn = enter(LockId::Network);
        let _c = enter(LockId::Controllers);
    }
}
