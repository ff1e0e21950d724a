//! Frame and payload shapes (spec §6 "Payload shapes required by the core").

use ciao_types::model::FailureReason;
use ciao_types::{InstanceId, NodeId};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// `RequestedResources` entries carried on START (spec §6): a type, an
/// integer value, and a mandatory flag. `NetworkNode` doubles as the 0/1
/// compute-vs-network-node placement flag (spec §4.2 "a network-node flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedResourceKind {
    VCpus,
    MemMb,
    DiskMb,
    NetworkNode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestedResourceEntry {
    pub kind: RequestedResourceKind,
    pub value: i64,
    pub mandatory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPayload {
    pub instance_id: InstanceId,
    pub image_id: String,
    pub requested_resources: Vec<RequestedResourceEntry>,
    pub firmware_type: String,
    pub persistence_mode: String,
}

/// Shared shape for RESTART/STOP/DELETE (spec §4.2, §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentCommandPayload {
    pub instance_id: InstanceId,
    pub workload_agent_uuid: NodeId,
}

/// EVACUATE carries only the agent id (spec §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvacuatePayload {
    pub workload_agent_uuid: NodeId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstanceStatEntry {
    pub instance_id: InstanceId,
    pub state: ciao_types::model::InstanceState,
    pub ssh_ip: Option<IpAddr>,
    pub ssh_port: Option<u16>,
    pub memory_usage_mb: u64,
    pub disk_usage_mb: u64,
    pub cpu_usage_percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPayload {
    pub node_id: NodeId,
    pub hostname: String,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub disk_total_mb: u64,
    pub disk_available_mb: u64,
    pub load: f32,
    pub cpu_count: u32,
    pub instances: Vec<InstanceStatEntry>,
}

/// READY carries the same node-level fields as STATS, without instances
/// (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub node_id: NodeId,
    pub memory_total_mb: u64,
    pub memory_available_mb: u64,
    pub disk_total_mb: u64,
    pub disk_available_mb: u64,
    pub load: f32,
    pub cpu_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub instance_id: InstanceId,
    pub reason: FailureReason,
}

/// TenantAdded / TenantRemoved / PublicIPAssigned / ConcentratorInstanceAdded
/// all carry a concentrator uuid (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConcentratorEventPayload {
    pub concentrator_id: NodeId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstanceDeletedPayload {
    pub instance_id: InstanceId,
    pub node_id: NodeId,
}

/// A single SSNTP frame (spec §6 "SSNTP frame roles"): one command, status,
/// event, or error per frame, each with at most one YAML payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SsntpFrame {
    // Commands
    Start(StartPayload),
    Restart(AgentCommandPayload),
    Stop(AgentCommandPayload),
    Delete(AgentCommandPayload),
    Evacuate(EvacuatePayload),
    Stats(StatsPayload),
    Configure(serde_json::Value),

    // Statuses
    Connected,
    Ready(ReadyPayload),
    Full,
    Maintenance,
    Offline,

    // Events
    TenantAdded(ConcentratorEventPayload),
    TenantRemoved(ConcentratorEventPayload),
    PublicIpAssigned(ConcentratorEventPayload),
    ConcentratorInstanceAdded(ConcentratorEventPayload),
    InstanceDeleted(InstanceDeletedPayload),
    TraceReport(serde_json::Value),

    // Errors
    StartFailure(ErrorPayload),
    StopFailure(ErrorPayload),
    RestartFailure(ErrorPayload),
    DeleteFailure(ErrorPayload),
}

impl SsntpFrame {
    pub fn frame_kind(&self) -> &'static str {
        match self {
            SsntpFrame::Start(_) => "START",
            SsntpFrame::Restart(_) => "RESTART",
            SsntpFrame::Stop(_) => "STOP",
            SsntpFrame::Delete(_) => "DELETE",
            SsntpFrame::Evacuate(_) => "EVACUATE",
            SsntpFrame::Stats(_) => "STATS",
            SsntpFrame::Configure(_) => "CONFIGURE",
            SsntpFrame::Connected => "CONNECTED",
            SsntpFrame::Ready(_) => "READY",
            SsntpFrame::Full => "FULL",
            SsntpFrame::Maintenance => "MAINTENANCE",
            SsntpFrame::Offline => "OFFLINE",
            SsntpFrame::TenantAdded(_) => "TenantAdded",
            SsntpFrame::TenantRemoved(_) => "TenantRemoved",
            SsntpFrame::PublicIpAssigned(_) => "PublicIPAssigned",
            SsntpFrame::ConcentratorInstanceAdded(_) => "ConcentratorInstanceAdded",
            SsntpFrame::InstanceDeleted(_) => "InstanceDeleted",
            SsntpFrame::TraceReport(_) => "TraceReport",
            SsntpFrame::StartFailure(_) => "StartFailure",
            SsntpFrame::StopFailure(_) => "StopFailure",
            SsntpFrame::RestartFailure(_) => "RestartFailure",
            SsntpFrame::DeleteFailure(_) => "DeleteFailure",
        }
    }
}

/// A frame paired with the identifier the transport associated with its
/// sender (a controller, compute agent, or network agent id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    pub sender_id: String,
    pub frame: SsntpFrame,
}

/// Encodes a payload to the wire format (spec §6/§7: "a YAML payload").
/// The transport frames and delivers the bytes; this is only the codec a
/// real transport implementation would call into.
pub fn encode_payload<T: Serialize>(payload: &T) -> crate::errors::SsntpResult<String> {
    serde_yaml::to_string(payload)
        .map_err(|e| crate::errors::SsntpError::InvalidPayload(e.to_string()))
}

/// Decodes a payload from its wire representation. A parse failure maps to
/// §7's `InvalidPayload` (start-failure to the originating controller, the
/// frame discarded).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(raw: &str) -> crate::errors::SsntpResult<T> {
    serde_yaml::from_str(raw).map_err(|e| crate::errors::SsntpError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod codec_tests {
    use super::*;

    #[test]
    fn start_payload_round_trips_through_yaml() {
        let payload = StartPayload {
            instance_id: ciao_types::InstanceId::new(),
            image_id: "clear-linux".into(),
            requested_resources: vec![RequestedResourceEntry {
                kind: RequestedResourceKind::MemMb,
                value: 256,
                mandatory: true,
            }],
            firmware_type: "efi".into(),
            persistence_mode: "host".into(),
        };
        let encoded = encode_payload(&payload).unwrap();
        let decoded: StartPayload = decode_payload(&encoded).unwrap();
        assert_eq!(decoded.instance_id, payload.instance_id);
        assert_eq!(decoded.requested_resources.len(), 1);
    }

    #[test]
    fn malformed_yaml_is_an_invalid_payload_error() {
        let result: crate::errors::SsntpResult<StartPayload> = decode_payload("not: valid: yaml: [");
        assert!(matches!(result, Err(crate::errors::SsntpError::InvalidPayload(_))));
    }
}
