//! The Scheduler (spec §4.2): connect/disconnect state machine, status
//! ingestion, and START placement, wired around the registries in
//! [`crate::registry`] and the forwarding decisions in [`crate::router`].

use crate::lock_order::{self, LockId};
use crate::metrics::SchedulerMetrics;
use crate::placement::{pick_compute_node, pick_network_node};
use crate::registry::{ComputeRegistry, ControllerRegistry, NetworkRegistry};
use crate::router::{route_forwarding, RouteDecision};
use ciao_ssntp::{InboundFrame, ReadyPayload, RequestedResourceKind, SsntpFrame, StatsPayload};
use ciao_types::model::{FailureReason, Node, NodeStatus};
use ciao_types::{InstanceId, NodeId};
use parking_lot::RwLock;
use tracing::{info, warn};

/// Which of the scheduler's two agent kinds connected (spec §4.2 "Compute
/// agent or network agent: insert with initial status `connected`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Compute,
    Network,
}

pub struct Scheduler {
    controllers: RwLock<ControllerRegistry>,
    compute: RwLock<ComputeRegistry>,
    network: RwLock<NetworkRegistry>,
    pub metrics: SchedulerMetrics,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            controllers: RwLock::new(ControllerRegistry::new()),
            compute: RwLock::new(ComputeRegistry::new()),
            network: RwLock::new(NetworkRegistry::new()),
            metrics: SchedulerMetrics::new(),
        }
    }

    /// Spec §4.2 "Connect/disconnect": controller role is claimed by the
    /// caller (the transport layer reads it off the connect handshake, out
    /// of scope here); agents are inserted with initial status `connected`.
    pub fn connect_controller(&self, id: String) {
        let _g = lock_order::enter(LockId::Controllers);
        if self.controllers.write().connect(id.clone()) {
            info!(controller = %id, "controller connected");
        } else {
            warn!(controller = %id, "duplicate controller connect ignored");
        }
    }

    pub fn connect_agent(&self, id: NodeId, hostname: impl Into<String>, kind: AgentKind) {
        let hostname = hostname.into();
        match kind {
            AgentKind::Compute => {
                let _g = lock_order::enter(LockId::Compute);
                self.compute.write().insert(Node::new_compute(id, hostname));
            }
            AgentKind::Network => {
                let _g = lock_order::enter(LockId::Network);
                self.network.write().insert(Node::new_network(id, hostname));
            }
        }
        info!(node = %id, kind = ?kind, "agent connected");
    }

    /// Locates and removes `id` from whichever registry it belongs to
    /// (spec §4.2 "On disconnect, locate the identifier across the three
    /// registries").
    pub fn disconnect(&self, id: &str) {
        {
            let _g = lock_order::enter(LockId::Controllers);
            if self.controllers.write().disconnect(id) {
                info!(peer = %id, "controller disconnected");
                return;
            }
        }
        if let Ok(node_id) = id.parse::<uuid::Uuid>().map(NodeId) {
            {
                let _g = lock_order::enter(LockId::Compute);
                if self.compute.write().remove(&node_id) {
                    info!(peer = %id, "compute node disconnected");
                    return;
                }
            }
            let _g = lock_order::enter(LockId::Network);
            if self.network.write().remove(&node_id) {
                info!(peer = %id, "network node disconnected");
            }
        }
    }

    /// Spec §4.2 "Master gating": a command from a controller is discarded
    /// unless it's recorded as master.
    pub fn is_master(&self, controller_id: &str) -> bool {
        let _g = lock_order::enter(LockId::Controllers);
        self.controllers.read().is_master(controller_id)
    }

    /// True if `id` names a connected compute or network agent rather than
    /// a controller. The transport layer is what actually knows which kind
    /// of connection a frame arrived on; this is a fallback for callers
    /// (like [`crate::service::SchedulerService`]) that only have a bare
    /// sender id to go on.
    pub fn is_known_agent(&self, id: &str) -> bool {
        let Ok(node_id) = id.parse::<uuid::Uuid>().map(NodeId) else {
            return false;
        };
        {
            let _g = lock_order::enter(LockId::Compute);
            if self.compute.read().get(&node_id).is_some() {
                return true;
            }
        }
        let _g = lock_order::enter(LockId::Network);
        self.network.read().get(&node_id).is_some()
    }

    /// READY updates node-level resource fields; any other status frame is
    /// merely recorded (spec §4.2 "Status frames").
    pub fn handle_status(&self, sender_id: NodeId, frame: &SsntpFrame) {
        match frame {
            SsntpFrame::Ready(ReadyPayload {
                memory_total_mb,
                memory_available_mb,
                load,
                cpu_count,
                ..
            }) => {
                let _g = lock_order::enter(LockId::Compute);
                self.compute.write().apply_ready(
                    sender_id,
                    NodeStatus::Ready,
                    *memory_total_mb,
                    *memory_available_mb,
                    *load,
                    *cpu_count,
                );
            }
            SsntpFrame::Full => self.set_compute_status(sender_id, NodeStatus::Full),
            SsntpFrame::Maintenance => self.set_compute_status(sender_id, NodeStatus::Maintenance),
            SsntpFrame::Offline => self.set_compute_status(sender_id, NodeStatus::Offline),
            SsntpFrame::Connected => self.set_compute_status(sender_id, NodeStatus::Connected),
            _ => {}
        }
    }

    fn set_compute_status(&self, node_id: NodeId, status: NodeStatus) {
        let _g = lock_order::enter(LockId::Compute);
        if let Some(node) = self.compute.write().get_mut(&node_id) {
            node.status = status;
        }
    }

    /// STATS frames are forwarded to all controllers verbatim (spec §4.2
    /// "STATS are not interpreted; they are forwarded to all controllers by
    /// static rule"). The node-level fields in a STATS frame are not the
    /// scheduler's concern beyond forwarding — `ciao-datastore` is what
    /// interprets per-instance deltas on the controller side.
    pub fn handle_stats(&self, _sender_id: NodeId, payload: StatsPayload) -> RouteDecision {
        RouteDecision::ForwardAll(SsntpFrame::Stats(payload))
    }

    /// START placement (spec §4.2 "Placement algorithm (START)").
    pub fn handle_start(&self, instance_id: InstanceId, frame: SsntpFrame) -> RouteDecision {
        let SsntpFrame::Start(payload) = &frame else {
            return RouteDecision::Discard("handle_start called with a non-START frame");
        };

        let mut memory_mb: Option<i64> = None;
        let mut network_node = false;
        for entry in &payload.requested_resources {
            match entry.kind {
                RequestedResourceKind::MemMb => memory_mb = Some(entry.value),
                RequestedResourceKind::NetworkNode => {
                    network_node = match entry.value {
                        0 => false,
                        1 => true,
                        _ => return self.start_failure(instance_id, FailureReason::InvalidPayload),
                    }
                }
                _ => {}
            }
        }
        let Some(memory_mb) = memory_mb.filter(|m| *m > 0) else {
            return self.start_failure(instance_id, FailureReason::InvalidPayload);
        };

        if network_node {
            let _g = lock_order::enter(LockId::Network);
            let mut network = self.network.write();
            if network.is_empty() {
                return self.start_failure(instance_id, FailureReason::NoNetworkNodes);
            }
            return match pick_network_node(&mut network) {
                Some(node_id) => {
                    self.metrics.record_placed();
                    RouteDecision::Forward {
                        to: node_id,
                        frame,
                    }
                }
                None => self.start_failure(instance_id, FailureReason::NoNetworkNodes),
            };
        }

        let _g = lock_order::enter(LockId::Compute);
        let mut compute = self.compute.write();
        if compute.is_empty() {
            return self.start_failure(instance_id, FailureReason::NoComputeNodes);
        }
        match pick_compute_node(&mut compute, memory_mb as u64) {
            Some(node_id) => {
                self.metrics.record_placed();
                RouteDecision::Forward {
                    to: node_id,
                    frame,
                }
            }
            None => self.start_failure(instance_id, FailureReason::FullCloud),
        }
    }

    fn start_failure(&self, instance_id: InstanceId, reason: FailureReason) -> RouteDecision {
        self.metrics.record_start_failure();
        RouteDecision::ForwardAll(SsntpFrame::StartFailure(ciao_ssntp::ErrorPayload {
            instance_id,
            reason,
        }))
    }

    /// Top-level dispatch for one inbound frame (spec §4.3 "Router").
    /// Master gating applies to commands from controllers only (spec §4.2
    /// "Master gating": "any command from a controller").
    pub fn dispatch(&self, inbound: InboundFrame, from_controller: bool) -> RouteDecision {
        if from_controller && is_command(&inbound.frame) && !self.is_master(&inbound.sender_id) {
            self.metrics.record_discarded();
            return RouteDecision::Discard("command from non-master controller");
        }

        let decision = match &inbound.frame {
            SsntpFrame::Start(payload) => {
                self.handle_start(payload.instance_id, inbound.frame.clone())
            }
            SsntpFrame::Stats(payload) => {
                let Ok(node_id) = inbound.sender_id.parse::<uuid::Uuid>().map(NodeId) else {
                    return RouteDecision::Discard("STATS sender id is not a node uuid");
                };
                self.handle_stats(node_id, payload.clone())
            }
            SsntpFrame::Ready(_)
            | SsntpFrame::Full
            | SsntpFrame::Maintenance
            | SsntpFrame::Offline
            | SsntpFrame::Connected => {
                if let Ok(node_id) = inbound.sender_id.parse::<uuid::Uuid>().map(NodeId) {
                    self.handle_status(node_id, &inbound.frame);
                }
                RouteDecision::Discard("status frame has no forwarding recipient")
            }
            _ => route_forwarding(inbound.frame),
        };

        match &decision {
            RouteDecision::Discard(reason) => {
                self.metrics.record_discarded();
                warn!(sender = %inbound.sender_id, reason, "frame discarded");
            }
            RouteDecision::Forward { .. } | RouteDecision::ForwardAll(_) => {
                self.metrics.record_forwarded();
            }
        }
        decision
    }
}

fn is_command(frame: &SsntpFrame) -> bool {
    matches!(
        frame,
        SsntpFrame::Start(_)
            | SsntpFrame::Restart(_)
            | SsntpFrame::Stop(_)
            | SsntpFrame::Delete(_)
            | SsntpFrame::Evacuate(_)
            | SsntpFrame::Stats(_)
            | SsntpFrame::Configure(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciao_ssntp::{RequestedResourceEntry, StartPayload};
    use ciao_types::model::NodeStatus;

    fn ready_node(id: NodeId, mb: u64) -> Node {
        let mut n = Node::new_compute(id, "n");
        n.status = NodeStatus::Ready;
        n.memory_total_mb = mb;
        n.memory_available_mb = mb;
        n
    }

    fn start_frame(instance_id: InstanceId, mem_mb: i64) -> SsntpFrame {
        SsntpFrame::Start(StartPayload {
            instance_id,
            image_id: "img".into(),
            requested_resources: vec![RequestedResourceEntry {
                kind: RequestedResourceKind::MemMb,
                value: mem_mb,
                mandatory: true,
            }],
            firmware_type: "efi".into(),
            persistence_mode: "host".into(),
        })
    }

    #[test]
    fn start_on_empty_cluster_fails_no_compute_nodes() {
        let scheduler = Scheduler::new();
        let instance_id = InstanceId::new();
        let decision = scheduler.handle_start(instance_id, start_frame(instance_id, 256));
        match decision {
            RouteDecision::ForwardAll(SsntpFrame::StartFailure(err)) => {
                assert_eq!(err.reason, FailureReason::NoComputeNodes);
            }
            other => panic!("expected NoComputeNodes StartFailure, got {other:?}"),
        }
    }

    #[test]
    fn start_picks_the_large_node_over_two_small_ones() {
        let scheduler = Scheduler::new();
        scheduler.compute.write().insert(ready_node(NodeId::new(), 200));
        scheduler.compute.write().insert(ready_node(NodeId::new(), 200));
        let large = NodeId::new();
        scheduler.compute.write().insert(ready_node(large, 141312));

        let instance_id = InstanceId::new();
        match scheduler.handle_start(instance_id, start_frame(instance_id, 256)) {
            RouteDecision::Forward { to, .. } => assert_eq!(to, large),
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn disconnecting_placement_target_forces_a_different_node_next_time() {
        let scheduler = Scheduler::new();
        let a = NodeId::new();
        let b = NodeId::new();
        scheduler.compute.write().insert(ready_node(a, 1000));
        scheduler.compute.write().insert(ready_node(b, 1000));

        let first = InstanceId::new();
        let chosen_first = match scheduler.handle_start(first, start_frame(first, 100)) {
            RouteDecision::Forward { to, .. } => to,
            other => panic!("expected Forward, got {other:?}"),
        };

        scheduler.disconnect(&chosen_first.0.to_string());

        let second = InstanceId::new();
        let chosen_second = match scheduler.handle_start(second, start_frame(second, 100)) {
            RouteDecision::Forward { to, .. } => to,
            other => panic!("expected Forward, got {other:?}"),
        };
        assert_ne!(chosen_first, chosen_second);
    }

    #[test]
    fn disconnecting_master_promotes_backup() {
        let scheduler = Scheduler::new();
        scheduler.connect_controller("a".into());
        scheduler.connect_controller("b".into());
        scheduler.disconnect("a");
        assert!(scheduler.is_master("b"));
    }

    #[test]
    fn command_from_non_master_is_discarded() {
        let scheduler = Scheduler::new();
        scheduler.connect_controller("a".into());
        scheduler.connect_controller("b".into());

        let instance_id = InstanceId::new();
        let inbound = InboundFrame {
            sender_id: "b".into(),
            frame: start_frame(instance_id, 256),
        };
        assert!(matches!(
            scheduler.dispatch(inbound, true),
            RouteDecision::Discard(_)
        ));
    }
}
