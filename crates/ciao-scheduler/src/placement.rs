//! Stateless first-fit placement (spec §4.2 "Placement algorithm (START)",
//! §1 Non-goals: "Optimal placement (best-fit) is explicitly rejected in
//! favor of fast first-fit").

use crate::registry::{ComputeRegistry, NetworkRegistry};
use ciao_types::NodeId;

/// Picks a compute node for `required_mb` and speculatively debits its
/// available memory (spec §4.2 steps 2-5). Returns `None` on total miss
/// (`FullCloud`, or `NoComputeNodes` if the registry is empty — the caller
/// distinguishes those by checking `registry.is_empty()` first).
pub fn pick_compute_node(registry: &mut ComputeRegistry, required_mb: u64) -> Option<NodeId> {
    if registry.is_empty() {
        return None;
    }
    let chosen = registry
        .search_order()
        .into_iter()
        .find(|id| registry.get(id).map(|n| n.fits(required_mb)).unwrap_or(false))?;

    if let Some(node) = registry.get_mut(&chosen) {
        node.memory_available_mb = node.memory_available_mb.saturating_sub(required_mb);
    }
    registry.mru = Some(chosen);
    Some(chosen)
}

/// Picks a network node, preferring one that differs from the last-used
/// network node when more than one candidate exists (spec §4.2 "Spread
/// heuristic").
pub fn pick_network_node(registry: &mut NetworkRegistry) -> Option<NodeId> {
    if registry.is_empty() {
        return None;
    }
    let last_used = registry.last_used;
    let ready = || {
        registry
            .candidates()
            .filter(|n| n.status == ciao_types::model::NodeStatus::Ready)
    };
    let chosen = ready()
        .find(|n| Some(n.id) != last_used)
        .or_else(|| ready().next())
        .map(|n| n.id)?;

    registry.last_used = Some(chosen);
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciao_types::model::{Node, NodeStatus};

    fn ready(id: NodeId, name: &str, mb: u64) -> Node {
        let mut n = Node::new_compute(id, name);
        n.status = NodeStatus::Ready;
        n.memory_total_mb = mb;
        n.memory_available_mb = mb;
        n
    }

    #[test]
    fn empty_registry_is_a_miss() {
        let mut reg = ComputeRegistry::new();
        assert_eq!(pick_compute_node(&mut reg, 256), None);
    }

    #[test]
    fn picks_the_only_node_that_fits() {
        let mut reg = ComputeRegistry::new();
        let small = NodeId::new();
        let large = NodeId::new();
        reg.insert(ready(small, "small", 200));
        reg.insert(ready(large, "large", 141312));

        let chosen = pick_compute_node(&mut reg, 256).unwrap();
        assert_eq!(chosen, large);
    }

    #[test]
    fn a_node_without_capacity_is_skipped() {
        let mut reg = ComputeRegistry::new();
        let a = NodeId::new();
        let b = NodeId::new();
        reg.insert(ready(a, "a", 100));
        reg.insert(ready(b, "b", 1000));

        let chosen = pick_compute_node(&mut reg, 500).unwrap();
        assert_eq!(chosen, b);
    }

    #[test]
    fn placement_debits_available_memory_speculatively() {
        let mut reg = ComputeRegistry::new();
        let a = NodeId::new();
        reg.insert(ready(a, "a", 1000));
        pick_compute_node(&mut reg, 300).unwrap();
        assert_eq!(reg.get(&a).unwrap().memory_available_mb, 700);
    }

    #[test]
    fn network_placement_prefers_a_different_node_than_last_used() {
        let mut reg = NetworkRegistry::new();
        let a = NodeId::new();
        let b = NodeId::new();
        reg.insert(ready(a, "a", 1000));
        reg.insert(ready(b, "b", 1000));
        reg.last_used = Some(a);

        let chosen = pick_network_node(&mut reg).unwrap();
        assert_eq!(chosen, b);
    }
}
