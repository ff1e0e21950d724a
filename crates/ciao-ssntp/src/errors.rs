use thiserror::Error;

pub type SsntpResult<T> = Result<T, SsntpError>;

#[derive(Error, Debug)]
pub enum SsntpError {
    #[error("frame send failed: {0}")]
    Send(String),

    #[error("payload did not parse: {0}")]
    InvalidPayload(String),
}

impl From<SsntpError> for ciao_types::CiaoError {
    fn from(e: SsntpError) -> Self {
        match e {
            SsntpError::Send(msg) => ciao_types::CiaoError::Transport(msg),
            SsntpError::InvalidPayload(msg) => ciao_types::CiaoError::InvalidPayload(msg),
        }
    }
}
