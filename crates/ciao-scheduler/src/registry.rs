//! The three scheduler registries (spec §2 "Scheduler Node Registry", §4.2
//! "Connect/disconnect"). Each registry is plain data; the locking and
//! lock-order discipline live in [`crate::scheduler::Scheduler`].

use ciao_types::model::{ControllerRegistration, ControllerRole, Node, NodeStatus};
use ciao_types::NodeId;
use std::collections::HashMap;

/// Ordered, master-first list of connected controllers (spec §3 "Controller
/// Registration"). At most one entry has role `Master`, and it occupies
/// position 0.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    order: Vec<ControllerRegistration>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|c| c.id == id)
    }

    pub fn has_master(&self) -> bool {
        self.order.iter().any(|c| c.role == ControllerRole::Master)
    }

    pub fn is_master(&self, id: &str) -> bool {
        self.order
            .first()
            .map(|c| c.role == ControllerRole::Master && c.id == id)
            .unwrap_or(false)
    }

    /// Inserts a newly connected controller. Returns `false` (and logs
    /// nothing itself — the caller logs) if `id` is already registered, per
    /// spec §4.2 "Duplicate connect for the same identifier is logged and
    /// ignored".
    pub fn connect(&mut self, id: String) -> bool {
        if self.contains(&id) {
            return false;
        }
        if self.has_master() {
            self.order.push(ControllerRegistration {
                id,
                role: ControllerRole::Backup,
            });
        } else {
            self.order.insert(
                0,
                ControllerRegistration {
                    id,
                    role: ControllerRole::Master,
                },
            );
        }
        true
    }

    /// Removes `id`. If it was master, promotes the first backup to master
    /// (spec §4.2, §8 scenario 6).
    pub fn disconnect(&mut self, id: &str) -> bool {
        let Some(pos) = self.order.iter().position(|c| c.id == id) else {
            return false;
        };
        let was_master = self.order[pos].role == ControllerRole::Master;
        self.order.remove(pos);
        if was_master {
            if let Some(new_master) = self.order.first_mut() {
                new_master.role = ControllerRole::Master;
            }
        }
        true
    }
}

/// Ordered compute-node list plus lookup map and MRU cursor (spec §4.2
/// "Placement algorithm").
#[derive(Debug, Default)]
pub struct ComputeRegistry {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
    /// Most-recently-chosen node, used to spread subsequent placements.
    pub mru: Option<NodeId>,
}

impl ComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn insert(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.order.push(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Removes `id`; nulls the MRU cursor if it pointed here (spec §4.2
    /// "for compute nodes, also null the MRU cursor if it pointed at the
    /// removed node").
    pub fn remove(&mut self, id: &NodeId) -> bool {
        let Some(pos) = self.order.iter().position(|n| n == id) else {
            return false;
        };
        self.order.remove(pos);
        self.nodes.remove(id);
        if self.mru == Some(*id) {
            self.mru = None;
        }
        true
    }

    /// Order the registry walks for first-fit, starting after the MRU
    /// cursor and wrapping back to the start (spec §4.2 step 4).
    pub fn search_order(&self) -> Vec<NodeId> {
        let start = self
            .mru
            .and_then(|mru| self.order.iter().position(|n| *n == mru))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let (after, before) = self.order.split_at(start.min(self.order.len()));
        after.iter().chain(before.iter()).copied().collect()
    }

    pub fn apply_ready(&mut self, id: NodeId, status: NodeStatus, memory_total_mb: u64, memory_available_mb: u64, cpu_load: f32, cpu_count: u32) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.status = status;
            node.memory_total_mb = memory_total_mb;
            node.memory_available_mb = memory_available_mb;
            node.cpu_load = cpu_load;
            node.cpu_count = cpu_count;
        }
    }
}

/// Map of network nodes plus a last-used cursor for the spread heuristic
/// (spec §4.2 "analogous across the network-node map").
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    nodes: HashMap<NodeId, Node>,
    pub last_used: Option<NodeId>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn remove(&mut self, id: &NodeId) -> bool {
        let removed = self.nodes.remove(id).is_some();
        if self.last_used == Some(*id) {
            self.last_used = None;
        }
        removed
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciao_types::NodeId;

    #[test]
    fn first_connect_becomes_master_at_position_zero() {
        let mut reg = ControllerRegistry::new();
        assert!(reg.connect("a".into()));
        assert!(reg.is_master("a"));
    }

    #[test]
    fn second_connect_is_backup() {
        let mut reg = ControllerRegistry::new();
        reg.connect("a".into());
        reg.connect("b".into());
        assert!(reg.is_master("a"));
        assert!(!reg.is_master("b"));
    }

    #[test]
    fn duplicate_connect_is_rejected() {
        let mut reg = ControllerRegistry::new();
        reg.connect("a".into());
        assert!(!reg.connect("a".into()));
    }

    #[test]
    fn disconnecting_master_promotes_backup() {
        let mut reg = ControllerRegistry::new();
        reg.connect("a".into());
        reg.connect("b".into());
        reg.disconnect("a");
        assert!(reg.is_master("b"));
    }

    #[test]
    fn removing_mru_node_nulls_cursor() {
        let mut reg = ComputeRegistry::new();
        let id = NodeId::new();
        reg.insert(Node::new_compute(id, "n1"));
        reg.mru = Some(id);
        reg.remove(&id);
        assert_eq!(reg.mru, None);
    }

    #[test]
    fn search_order_starts_after_mru() {
        let mut reg = ComputeRegistry::new();
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();
        reg.insert(Node::new_compute(a, "a"));
        reg.insert(Node::new_compute(b, "b"));
        reg.insert(Node::new_compute(c, "c"));
        reg.mru = Some(a);
        assert_eq!(reg.search_order(), vec![b, c, a]);
    }
}
