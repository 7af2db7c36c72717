use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// More bytes have to be read before the op can be decoded.
    #[error("insufficient buffer, needed {needed} bytes but {available} are available")]
    InsufficientBuffer { needed: usize, available: usize },
    #[error("control line exceeds {0} bytes")]
    ControlLineTooLong(usize),
    #[error("unknown protocol operation `{0}`")]
    UnknownOp(String),
    #[error("bad arguments for {op}: `{args}`")]
    BadArguments { op: &'static str, args: String },
    #[error("bad payload length `{0}`")]
    BadPayloadLength(String),
    #[error("payload of {len} bytes exceeds the limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("payload is not terminated by CRLF")]
    MissingPayloadTerminator,
    #[error("bad json: {0}")]
    BadJson(String),
    #[error("control line is not valid utf-8")]
    BadUtf8,
    #[error("invalid subject `{0}`")]
    BadSubject(String),
}

impl From<serde_json::Error> for ProtoError {
    fn from(err: serde_json::Error) -> ProtoError {
        ProtoError::BadJson(err.to_string())
    }
}
