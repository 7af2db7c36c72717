use crate::{error::ProtoError, op::Op, parsable::*};
use bytes::{BufMut, Bytes};

/// `MSG <subject> <sid> [reply-to] <#bytes>\r\n[payload]\r\n`, the delivery
/// of a published message to one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    subject: String,
    sid: u64,
    reply_to: Option<String>,
    payload: Bytes,
}

impl Message {
    pub fn new(subject: &str, sid: u64, payload: Bytes) -> Message {
        Message {
            subject: subject.to_owned(),
            sid,
            reply_to: None,
            payload,
        }
    }
    pub fn subject(&self) -> &str {
        &self.subject
    }
    pub fn sid(&self) -> u64 {
        self.sid
    }
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
    pub fn build(self) -> Op {
        Op::Msg(self)
    }

    pub(crate) fn deserialize(
        args: &str,
        buf: &[u8],
        start: usize,
        max_payload: usize,
    ) -> Result<(Self, usize), ProtoError> {
        let (subject, sid, reply_to, len) = match fields(args)[..] {
            [subject, sid, len] => (subject, sid, None, len),
            [subject, sid, reply_to, len] => (subject, sid, Some(reply_to.to_owned()), len),
            _ => {
                return Err(ProtoError::BadArguments {
                    op: "MSG",
                    args: args.trim().to_owned(),
                })
            }
        };
        let sid = parse_sid("MSG", sid, args)?;
        let len = parse_len(len)?;
        let (payload, consumed) = take_payload(buf, start, len, max_payload)?;
        Ok((
            Message {
                subject: subject.to_owned(),
                sid,
                reply_to,
                payload,
            },
            consumed,
        ))
    }
}

impl Parsable for Message {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"MSG ");
        buf.put_slice(self.subject.as_bytes());
        buf.put_u8(b' ');
        put_decimal(buf, self.sid);
        if let Some(reply_to) = &self.reply_to {
            buf.put_u8(b' ');
            buf.put_slice(reply_to.as_bytes());
        }
        buf.put_u8(b' ');
        put_decimal(buf, self.payload.len() as u64);
        buf.put_slice(CRLF);
        buf.put_slice(&self.payload);
        buf.put_slice(CRLF);
        Ok(())
    }
    fn size(&self) -> usize {
        "MSG ".len()
            + self.subject.len()
            + 1
            + decimal_len(self.sid)
            + self.reply_to.as_ref().map(|r| r.len() + 1).unwrap_or(0)
            + 1
            + decimal_len(self.payload.len() as u64)
            + CRLF.len()
            + self.payload.len()
            + CRLF.len()
    }
}
