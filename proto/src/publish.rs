use crate::{error::ProtoError, op::Op, parsable::*, subject::validate_subject};
use bytes::{BufMut, Bytes};

/// `PUB <subject> [reply-to] <#bytes>\r\n[payload]\r\n`
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    subject: String,
    reply_to: Option<String>,
    payload: Bytes,
}

impl Publish {
    pub fn new(subject: &str) -> Result<Publish, ProtoError> {
        validate_subject(subject)?;
        Ok(Publish {
            subject: subject.to_owned(),
            reply_to: None,
            payload: Bytes::new(),
        })
    }
    pub fn set_reply_to(&mut self, reply_to: &str) -> Result<(), ProtoError> {
        validate_subject(reply_to)?;
        self.reply_to = Some(reply_to.to_owned());
        Ok(())
    }
    pub fn set_payload(&mut self, payload: Bytes) {
        self.payload = payload;
    }
    pub fn subject(&self) -> &str {
        &self.subject
    }
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }
    pub fn payload(&self) -> Bytes {
        self.payload.clone()
    }
    pub fn build(self) -> Op {
        Op::Pub(self)
    }

    /// Decodes the control line arguments and the payload that follows them;
    /// `start` is the offset of the payload in `buf`.
    pub(crate) fn deserialize(
        args: &str,
        buf: &[u8],
        start: usize,
        max_payload: usize,
    ) -> Result<(Self, usize), ProtoError> {
        let (subject, reply_to, len) = match fields(args)[..] {
            [subject, len] => (subject, None, len),
            [subject, reply_to, len] => (subject, Some(reply_to.to_owned()), len),
            _ => {
                return Err(ProtoError::BadArguments {
                    op: "PUB",
                    args: args.trim().to_owned(),
                })
            }
        };
        let len = parse_len(len)?;
        let (payload, consumed) = take_payload(buf, start, len, max_payload)?;
        Ok((
            Publish {
                subject: subject.to_owned(),
                reply_to,
                payload,
            },
            consumed,
        ))
    }
}

impl Parsable for Publish {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        buf.put_slice(b"PUB ");
        buf.put_slice(self.subject.as_bytes());
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
        "PUB ".len()
            + self.subject.len()
            + self.reply_to.as_ref().map(|r| r.len() + 1).unwrap_or(0)
            + 1
            + decimal_len(self.payload.len() as u64)
            + CRLF.len()
            + self.payload.len()
            + CRLF.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    #[test]
    fn test_bad_publish() {
        assert_eq!(
            Publish::new("foo bar").unwrap_err(),
            ProtoError::BadSubject("foo bar".to_owned())
        );
        assert!(Publish::new("").is_err());
    }
    #[test]
    fn test_publish() {
        let mut publish = Publish::new("foo.bar").unwrap();
        publish.set_reply_to("INBOX.1").unwrap();
        publish.set_payload(Bytes::from_static(b"hello"));
        let mut b = BytesMut::new();
        publish.serialize(&mut b).unwrap();
        assert_eq!(b.len(), publish.size());
        assert_eq!(&b[..], &b"PUB foo.bar INBOX.1 5\r\nhello\r\n"[..]);
    }
    #[test]
    fn test_empty_payload() {
        let publish = Publish::new("foo").unwrap();
        let mut b = BytesMut::new();
        publish.serialize(&mut b).unwrap();
        assert_eq!(b.len(), publish.size());
        assert_eq!(&b[..], &b"PUB foo 0\r\n\r\n"[..]);
    }
}
