use crate::{error::ProtoError, op::Op, parsable::*};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Options a client negotiates with the `CONNECT` op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connect {
    pub verbose: bool,
    pub pedantic: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub version: String,
}

impl Default for Connect {
    fn default() -> Self {
        Self::new()
    }
}

impl Connect {
    pub fn new() -> Connect {
        Connect {
            verbose: false,
            pedantic: false,
            user: None,
            pass: None,
            name: None,
            lang: "rust".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
    pub fn set_credentials(&mut self, user: &str, pass: Option<&str>) {
        self.user = Some(user.to_owned());
        self.pass = pass.map(|p| p.to_owned());
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_owned());
    }
    pub(crate) fn parse_args(args: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(args.trim())?)
    }
    pub fn build(self) -> Op {
        Op::Connect(self)
    }
}

impl Parsable for Connect {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"CONNECT ");
        buf.put_slice(&serde_json::to_vec(self)?);
        buf.put_slice(CRLF);
        Ok(())
    }
    fn size(&self) -> usize {
        "CONNECT ".len() + serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0) + CRLF.len()
    }
}
