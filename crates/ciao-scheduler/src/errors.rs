//! Error taxonomy for the Scheduler (spec §7): surfaced only through SSNTP
//! error frames and discard decisions, never returned to an HTTP caller.

use thiserror::Error;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ciao_ssntp::SsntpError> for SchedulerError {
    fn from(err: ciao_ssntp::SsntpError) -> Self {
        match err {
            ciao_ssntp::SsntpError::Send(msg) => SchedulerError::Transport(msg),
            ciao_ssntp::SsntpError::InvalidPayload(msg) => SchedulerError::InvalidPayload(msg),
        }
    }
}
