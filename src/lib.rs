pub mod backend;
pub mod bench;
pub mod core;
pub mod history_cmd;
pub mod integrate_cmd;
pub mod quad;
pub mod report;
pub mod storage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuadError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("worker failed on partition {partition_index}: {cause}")]
    WorkerError { partition_index: usize, cause: String },
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl QuadError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        QuadError::InvalidArgument(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        QuadError::TransportError(msg.into())
    }
}

pub type QuadResult<T> = Result<T, QuadError>;

// Shared helpers
pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}
