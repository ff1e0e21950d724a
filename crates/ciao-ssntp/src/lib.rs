//! # ciao-ssntp
//!
//! Wire-level types for the SSNTP binary RPC fabric (spec §6) and the
//! `FrameSink` port the Scheduler sends frames through.
//!
//! The SSNTP transport itself — framing, TLS, reconnection — is an
//! out-of-scope collaborator (spec §1). This crate only specifies the
//! payload shapes the scheduler core consumes and emits, and a trait
//! boundary a real transport implementation plugs into.

pub mod errors;
pub mod frame;
pub mod sink;

pub use errors::{SsntpError, SsntpResult};
pub use frame::{
    decode_payload, encode_payload, AgentCommandPayload, ConcentratorEventPayload, ErrorPayload,
    EvacuatePayload, InboundFrame, InstanceDeletedPayload, InstanceStatEntry, ReadyPayload,
    RequestedResourceEntry, RequestedResourceKind, SsntpFrame, StartPayload, StatsPayload,
};
pub use sink::{AllControllersSink, FrameSink};
