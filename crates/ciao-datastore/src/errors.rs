//! Error taxonomy for the Datastore Cache (spec §7).

use ciao_types::CiaoError;
use thiserror::Error;

pub type DatastoreResult<T> = Result<T, DatastoreError>;

#[derive(Error, Debug)]
pub enum DatastoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {resource} limit {limit} would be exceeded by usage {current}")]
    QuotaExceeded {
        resource: String,
        limit: i64,
        current: i64,
    },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<CiaoError> for DatastoreError {
    fn from(err: CiaoError) -> Self {
        match err {
            CiaoError::NotFound(msg) => DatastoreError::NotFound(msg),
            CiaoError::QuotaExceeded {
                resource,
                requested: _,
                limit,
                current,
            } => DatastoreError::QuotaExceeded {
                resource,
                limit,
                current,
            },
            CiaoError::ResourceExhausted(msg) => DatastoreError::ResourceExhausted(msg),
            CiaoError::InvalidPayload(msg) => DatastoreError::InvalidPayload(msg),
            other => DatastoreError::Persistence(other.to_string()),
        }
    }
}

impl DatastoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatastoreError::NotFound(_))
    }

    /// True for errors that should never roll back a cache mutation already
    /// applied (spec §4.1 "Failure policy").
    pub fn is_persistence_only(&self) -> bool {
        matches!(self, DatastoreError::Persistence(_))
    }
}
