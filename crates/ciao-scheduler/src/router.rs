//! The Command/Event Router (spec §4.3): a decision function keyed by
//! frame type. START and status frames are handled directly by
//! [`crate::scheduler::Scheduler`] since they mutate the registries;
//! everything here is a pure forwarding decision over an already-decoded
//! frame.

use ciao_types::NodeId;
use ciao_ssntp::SsntpFrame;

/// The three outcomes a router may reach for any inbound frame (spec §4.3).
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Send `frame` to exactly one named recipient.
    Forward { to: NodeId, frame: SsntpFrame },
    /// Broadcast `frame` to every connected controller (spec §4.2
    /// "Forwarding (events)").
    ForwardAll(SsntpFrame),
    /// Drop the frame; `reason` is for logging only.
    Discard(&'static str),
}

/// Routes the frame kinds that are pure forwarding decisions: RESTART,
/// STOP, DELETE, EVACUATE (to the named agent); TenantAdded, TenantRemoved,
/// PublicIPAssigned (to the named concentrator); and the error/event kinds
/// broadcast to all controllers, including ConcentratorInstanceAdded (spec
/// §4.2 "Forwarding").
///
/// START, STATS, READY, and the other status frames are not handled here —
/// they mutate scheduler state and are dispatched directly by `Scheduler`.
pub fn route_forwarding(frame: SsntpFrame) -> RouteDecision {
    match frame {
        SsntpFrame::Restart(payload) => RouteDecision::Forward {
            to: payload.workload_agent_uuid,
            frame: SsntpFrame::Restart(payload),
        },
        SsntpFrame::Stop(payload) => RouteDecision::Forward {
            to: payload.workload_agent_uuid,
            frame: SsntpFrame::Stop(payload),
        },
        SsntpFrame::Delete(payload) => RouteDecision::Forward {
            to: payload.workload_agent_uuid,
            frame: SsntpFrame::Delete(payload),
        },
        SsntpFrame::Evacuate(payload) => RouteDecision::Forward {
            to: payload.workload_agent_uuid,
            frame: SsntpFrame::Evacuate(payload),
        },

        SsntpFrame::TenantAdded(payload) => RouteDecision::Forward {
            to: payload.concentrator_id,
            frame: SsntpFrame::TenantAdded(payload),
        },
        SsntpFrame::TenantRemoved(payload) => RouteDecision::Forward {
            to: payload.concentrator_id,
            frame: SsntpFrame::TenantRemoved(payload),
        },
        SsntpFrame::PublicIpAssigned(payload) => RouteDecision::Forward {
            to: payload.concentrator_id,
            frame: SsntpFrame::PublicIpAssigned(payload),
        },

        frame @ (SsntpFrame::StartFailure(_)
        | SsntpFrame::StopFailure(_)
        | SsntpFrame::RestartFailure(_)
        | SsntpFrame::DeleteFailure(_)
        | SsntpFrame::TraceReport(_)
        | SsntpFrame::InstanceDeleted(_)
        | SsntpFrame::ConcentratorInstanceAdded(_)) => RouteDecision::ForwardAll(frame),

        other => RouteDecision::Discard(frame_kind_unhandled(&other)),
    }
}

fn frame_kind_unhandled(frame: &SsntpFrame) -> &'static str {
    match frame {
        SsntpFrame::Start(_) => "START is handled by Scheduler::handle_start, not the router",
        SsntpFrame::Stats(_) => "STATS is handled by Scheduler::handle_stats, not the router",
        SsntpFrame::Configure(_) => "CONFIGURE has no routing rule",
        SsntpFrame::Connected
        | SsntpFrame::Ready(_)
        | SsntpFrame::Full
        | SsntpFrame::Maintenance
        | SsntpFrame::Offline => "status frames are handled by Scheduler::handle_status",
        _ => "unroutable frame",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciao_ssntp::{AgentCommandPayload, ConcentratorEventPayload, ErrorPayload};
    use ciao_types::model::FailureReason;
    use ciao_types::InstanceId;

    #[test]
    fn stop_forwards_to_its_agent() {
        let agent = NodeId::new();
        let frame = SsntpFrame::Stop(AgentCommandPayload {
            instance_id: InstanceId::new(),
            workload_agent_uuid: agent,
        });
        match route_forwarding(frame) {
            RouteDecision::Forward { to, .. } => assert_eq!(to, agent),
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn tenant_added_forwards_to_concentrator() {
        let concentrator = NodeId::new();
        let frame = SsntpFrame::TenantAdded(ConcentratorEventPayload {
            concentrator_id: concentrator,
        });
        match route_forwarding(frame) {
            RouteDecision::Forward { to, .. } => assert_eq!(to, concentrator),
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn start_failure_broadcasts_to_all_controllers() {
        let frame = SsntpFrame::StartFailure(ErrorPayload {
            instance_id: InstanceId::new(),
            reason: FailureReason::FullCloud,
        });
        assert!(matches!(
            route_forwarding(frame),
            RouteDecision::ForwardAll(_)
        ));
    }

    #[test]
    fn start_is_not_handled_here() {
        let frame = SsntpFrame::Configure(serde_json::json!({}));
        assert!(matches!(
            route_forwarding(frame),
            RouteDecision::Discard(_)
        ));
    }
}
