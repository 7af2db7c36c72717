//! Codec for the NATS text protocol.
//!
//! Every op is a CRLF-terminated control line; `PUB` and `MSG` are followed by
//! a payload of the announced length and another CRLF.

mod connect;
mod error;
mod info;
mod message;
mod op;
mod parsable;
mod publish;
mod subject;
mod subscribe;

pub mod prelude {
    pub use super::{
        connect::*, error::*, info::*, message::*, op::*, parsable::{Parsable, MAX_CONTROL_LINE, MAX_PAYLOAD},
        publish::*, subject::is_wildcard, subscribe::*,
    };
}
