use natsbench_proto::prelude::ProtoError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: &'static str },
    #[error("failed to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),
    #[error("server error: {0}")]
    Server(String),
    #[error("connection to the broker was lost")]
    Disconnected,
    #[error("connection is closed")]
    Closed,
    #[error("payload of {size} bytes exceeds the server limit of {max} bytes")]
    PayloadTooBig { size: usize, max: usize },
}

impl BrokerError {
    /// Whether the connection is unusable and the run has to stop. Anything
    /// else only affects the request that caused it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BrokerError::InvalidUri { .. } | BrokerError::Connect { .. } | BrokerError::Disconnected
        )
    }
}
