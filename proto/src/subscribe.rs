use crate::{error::ProtoError, op::Op, parsable::*, subject::validate_subject};
use bytes::BufMut;

/// `SUB <subject> [queue group] <sid>`
#[derive(Debug, Clone, PartialEq)]
pub struct Subscribe {
    subject: String,
    queue: Option<String>,
    sid: u64,
}

impl Subscribe {
    pub fn new(subject: &str, sid: u64) -> Result<Subscribe, ProtoError> {
        validate_subject(subject)?;
        Ok(Subscribe {
            subject: subject.to_owned(),
            queue: None,
            sid,
        })
    }
    pub fn set_queue(&mut self, queue: &str) -> Result<(), ProtoError> {
        validate_subject(queue)?;
        self.queue = Some(queue.to_owned());
        Ok(())
    }
    pub fn subject(&self) -> &str {
        &self.subject
    }
    pub fn queue(&self) -> Option<&str> {
        self.queue.as_deref()
    }
    pub fn sid(&self) -> u64 {
        self.sid
    }
    pub fn build(self) -> Op {
        Op::Sub(self)
    }
    pub(crate) fn parse_args(args: &str) -> Result<Self, ProtoError> {
        let (subject, queue, sid) = match fields(args)[..] {
            [subject, sid] => (subject, None, sid),
            [subject, queue, sid] => (subject, Some(queue.to_owned()), sid),
            _ => {
                return Err(ProtoError::BadArguments {
                    op: "SUB",
                    args: args.trim().to_owned(),
                })
            }
        };
        Ok(Subscribe {
            subject: subject.to_owned(),
            queue,
            sid: parse_sid("SUB", sid, args)?,
        })
    }
}

impl Parsable for Subscribe {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"SUB ");
        buf.put_slice(self.subject.as_bytes());
        if let Some(queue) = &self.queue {
            buf.put_u8(b' ');
            buf.put_slice(queue.as_bytes());
        }
        buf.put_u8(b' ');
        put_decimal(buf, self.sid);
        buf.put_slice(CRLF);
        Ok(())
    }
    fn size(&self) -> usize {
        "SUB ".len()
            + self.subject.len()
            + self.queue.as_ref().map(|q| q.len() + 1).unwrap_or(0)
            + 1
            + decimal_len(self.sid)
            + CRLF.len()
    }
}

/// `UNSUB <sid> [max_msgs]`
#[derive(Debug, Clone, PartialEq)]
pub struct Unsubscribe {
    sid: u64,
    max_msgs: Option<u64>,
}

impl Unsubscribe {
    pub fn new(sid: u64) -> Unsubscribe {
        Unsubscribe {
            sid,
            max_msgs: None,
        }
    }
    /// Let the broker drop the subscription after `max_msgs` more deliveries.
    pub fn set_max_msgs(&mut self, max_msgs: u64) {
        self.max_msgs = Some(max_msgs);
    }
    pub fn sid(&self) -> u64 {
        self.sid
    }
    pub fn max_msgs(&self) -> Option<u64> {
        self.max_msgs
    }
    pub fn build(self) -> Op {
        Op::Unsub(self)
    }
    pub(crate) fn parse_args(args: &str) -> Result<Self, ProtoError> {
        match fields(args)[..] {
            [sid] => Ok(Unsubscribe::new(parse_sid("UNSUB", sid, args)?)),
            [sid, max] => Ok(Unsubscribe {
                sid: parse_sid("UNSUB", sid, args)?,
                max_msgs: Some(parse_sid("UNSUB", max, args)?),
            }),
            _ => Err(ProtoError::BadArguments {
                op: "UNSUB",
                args: args.trim().to_owned(),
            }),
        }
    }
}

impl Parsable for Unsubscribe {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"UNSUB ");
        put_decimal(buf, self.sid);
        if let Some(max) = self.max_msgs {
            buf.put_u8(b' ');
            put_decimal(buf, max);
        }
        buf.put_slice(CRLF);
        Ok(())
    }
    fn size(&self) -> usize {
        "UNSUB ".len()
            + decimal_len(self.sid)
            + self.max_msgs.map(|m| decimal_len(m) + 1).unwrap_or(0)
            + CRLF.len()
    }
}
