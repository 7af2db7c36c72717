use crate::{error::ProtoError, op::Op, parsable::*};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Default `max_payload` of a broker that does not advertise one.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// The `INFO` document a broker sends right after accepting a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub server_id: String,
    pub host: String,
    pub port: u16,
    pub version: String,
    pub auth_required: bool,
    pub ssl_required: bool,
    pub max_payload: usize,
}

impl Default for ServerInfo {
    fn default() -> Self {
        ServerInfo {
            server_id: String::new(),
            host: String::new(),
            port: 0,
            version: String::new(),
            auth_required: false,
            ssl_required: false,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ServerInfo {
    pub(crate) fn parse_args(args: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(args.trim())?)
    }
    pub fn build(self) -> Op {
        Op::Info(self)
    }
}

impl Parsable for ServerInfo {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"INFO ");
        buf.put_slice(&serde_json::to_vec(self)?);
        buf.put_slice(CRLF);
        Ok(())
    }
    fn size(&self) -> usize {
        "INFO ".len() + serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0) + CRLF.len()
    }
}
