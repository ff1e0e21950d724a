//! Error taxonomy shared across the control plane (spec §7).

use thiserror::Error;

pub type CiaoResult<T> = Result<T, CiaoError>;

/// The error taxonomy described in §7. Each crate that sits at a boundary
/// (datastore, scheduler) defines its own narrower error enum for its own
/// internal use and converts into this one at the edges it shares with
/// callers from other crates.
#[derive(Error, Debug)]
pub enum CiaoError {
    /// Requested tenant, instance, workload, or node absent. Surfaced
    /// verbatim to the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// A resource counter would exceed its limit; the action is rejected
    /// pre-persist.
    #[error("quota exceeded for {resource}: requested {requested}, limit {limit}, current usage {current}")]
    QuotaExceeded {
        resource: String,
        requested: i64,
        limit: i64,
        current: i64,
    },

    /// The allocator found no free subnet or no free host byte. Surfaced
    /// upstream as `FullCloud`.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A payload failed to parse or violated a domain constraint.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The downstream persistent store failed. The cache state is retained;
    /// the error is returned to the operation's immediate caller.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An SSNTP send failed. Logged; no retry at this layer.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame arrived from a controller that is not master, or from an
    /// unknown sender. Logged and discarded.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl CiaoError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
