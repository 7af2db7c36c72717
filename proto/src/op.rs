use crate::{
    connect::Connect, error::ProtoError, info::ServerInfo, message::Message, parsable::*,
    publish::Publish, subscribe::{Subscribe, Unsubscribe},
};
use bytes::BufMut;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Info(ServerInfo),
    Connect(Connect),
    Pub(Publish),
    Sub(Subscribe),
    Unsub(Unsubscribe),
    Msg(Message),
    Ping,
    Pong,
    Ok,
    Err(String),
}

impl Op {
    pub fn to_bytes<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        self.serialize(buf)
    }

    /// Decodes one op from the front of `buf`, returning it together with the
    /// number of bytes it occupied. Payloads are limited to [`MAX_PAYLOAD`].
    ///
    /// # Error handling
    /// When `buf` holds only part of an op, `ProtoError::InsufficientBuffer` is
    /// returned and the caller should read more bytes and retry from the same
    /// position.
    pub fn parse(buf: &[u8]) -> Result<(Op, usize), ProtoError> {
        Op::parse_limited(buf, MAX_PAYLOAD)
    }

    /// Like [`Op::parse`], refusing `PUB`/`MSG` payloads longer than
    /// `max_payload` with `ProtoError::PayloadTooLarge`.
    pub fn parse_limited(buf: &[u8], max_payload: usize) -> Result<(Op, usize), ProtoError> {
        let line_end = match find_crlf(buf) {
            Some(i) if i > MAX_CONTROL_LINE => {
                return Err(ProtoError::ControlLineTooLong(MAX_CONTROL_LINE))
            }
            Some(i) => i,
            None if buf.len() > MAX_CONTROL_LINE => {
                return Err(ProtoError::ControlLineTooLong(MAX_CONTROL_LINE))
            }
            None => {
                return Err(ProtoError::InsufficientBuffer {
                    needed: buf.len() + 1,
                    available: buf.len(),
                })
            }
        };
        let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ProtoError::BadUtf8)?;
        let consumed = line_end + CRLF.len();
        let (verb, args) = split_verb(line);
        let no_args = |op: &'static str| {
            if args.trim().is_empty() {
                Ok(())
            } else {
                Err(ProtoError::BadArguments {
                    op,
                    args: args.trim().to_owned(),
                })
            }
        };
        match verb.to_ascii_uppercase().as_str() {
            "INFO" => Ok((Op::Info(ServerInfo::parse_args(args)?), consumed)),
            "CONNECT" => Ok((Op::Connect(Connect::parse_args(args)?), consumed)),
            "PUB" => {
                let (p, consumed) = Publish::deserialize(args, buf, consumed, max_payload)?;
                Ok((Op::Pub(p), consumed))
            }
            "MSG" => {
                let (m, consumed) = Message::deserialize(args, buf, consumed, max_payload)?;
                Ok((Op::Msg(m), consumed))
            }
            "SUB" => Ok((Op::Sub(Subscribe::parse_args(args)?), consumed)),
            "UNSUB" => Ok((Op::Unsub(Unsubscribe::parse_args(args)?), consumed)),
            "PING" => no_args("PING").map(|_| (Op::Ping, consumed)),
            "PONG" => no_args("PONG").map(|_| (Op::Pong, consumed)),
            "+OK" => no_args("+OK").map(|_| (Op::Ok, consumed)),
            "-ERR" => Ok((Op::Err(unquote(args.trim()).to_owned()), consumed)),
            _ => Err(ProtoError::UnknownOp(verb.to_owned())),
        }
    }
}

/// `-ERR 'Unknown Protocol Operation'` carries its message in single quotes.
fn unquote(s: &str) -> &str {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(s)
}

impl Parsable for Op {
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError> {
        match self {
            Op::Info(i) => i.serialize(buf)?,
            Op::Connect(c) => c.serialize(buf)?,
            Op::Pub(p) => p.serialize(buf)?,
            Op::Sub(s) => s.serialize(buf)?,
            Op::Unsub(u) => u.serialize(buf)?,
            Op::Msg(m) => m.serialize(buf)?,
            Op::Ping => buf.put_slice(b"PING\r\n"),
            Op::Pong => buf.put_slice(b"PONG\r\n"),
            Op::Ok => buf.put_slice(b"+OK\r\n"),
            Op::Err(e) => {
                buf.put_slice(b"-ERR '");
                buf.put_slice(e.as_bytes());
                buf.put_slice(b"'\r\n");
            }
        }
        Ok(())
    }
    fn size(&self) -> usize {
        match self {
            Op::Info(i) => i.size(),
            Op::Connect(c) => c.size(),
            Op::Pub(p) => p.size(),
            Op::Sub(s) => s.size(),
            Op::Unsub(u) => u.size(),
            Op::Msg(m) => m.size(),
            Op::Ping | Op::Pong => 6,
            Op::Ok => 5,
            Op::Err(e) => "-ERR ''".len() + e.len() + CRLF.len(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::{Bytes, BytesMut};
    #[test]
    fn test_ping_pong_ok() {
        assert_eq!(Op::parse(b"PING\r\n").unwrap(), (Op::Ping, 6));
        assert_eq!(Op::parse(b"pong\r\nPING\r\n").unwrap(), (Op::Pong, 6));
        assert_eq!(Op::parse(b"+OK\r\n").unwrap(), (Op::Ok, 5));
        assert!(matches!(
            Op::parse(b"PING now\r\n"),
            Err(ProtoError::BadArguments { op: "PING", .. })
        ));
        let mut b = BytesMut::new();
        Op::Pong.to_bytes(&mut b).unwrap();
        assert_eq!(b.len(), Op::Pong.size());
    }
    #[test]
    fn test_err() {
        let (op, len) = Op::parse(b"-ERR 'Unknown Protocol Operation'\r\n").unwrap();
        assert_eq!(op, Op::Err("Unknown Protocol Operation".to_owned()));
        assert_eq!(len, 35);
        let mut b = BytesMut::new();
        op.to_bytes(&mut b).unwrap();
        assert_eq!(b.len(), op.size());
        assert_eq!(&b[..], &b"-ERR 'Unknown Protocol Operation'\r\n"[..]);
    }
    #[test]
    fn test_msg_in_pieces() {
        let wire = b"MSG foo.bar   9 INBOX.7 11\r\nhello world\r\nPING\r\n";
        // every strict prefix that ends inside the first op asks for more bytes
        for end in 0..41 {
            assert!(
                matches!(
                    Op::parse(&wire[..end]),
                    Err(ProtoError::InsufficientBuffer { .. })
                ),
                "prefix of {} bytes",
                end
            );
        }
        let (op, len) = Op::parse(wire).unwrap();
        assert_eq!(len, 41);
        match op {
            Op::Msg(m) => {
                assert_eq!(m.subject(), "foo.bar");
                assert_eq!(m.sid(), 9);
                assert_eq!(m.reply_to(), Some("INBOX.7"));
                assert_eq!(m.payload(), &Bytes::from_static(b"hello world"));
            }
            _ => panic!("expected a MSG"),
        }
        assert_eq!(Op::parse(&wire[len..]).unwrap(), (Op::Ping, 6));
    }
    #[test]
    fn test_msg_wire_format() {
        let msg = Message::new("foo", 1, Bytes::from_static(b"abc")).build();
        let mut b = BytesMut::new();
        msg.to_bytes(&mut b).unwrap();
        assert_eq!(&b[..], &b"MSG foo 1 3\r\nabc\r\n"[..]);
        assert_eq!(b.len(), msg.size());
        assert_eq!(Op::parse(&b).unwrap(), (msg, b.len()));
    }
    #[test]
    fn test_pub_from_client() {
        let (op, len) = Op::parse(b"pub foo 2\r\nhi\r\n").unwrap();
        assert_eq!(len, 15);
        match op {
            Op::Pub(p) => {
                assert_eq!(p.subject(), "foo");
                assert_eq!(p.payload(), Bytes::from_static(b"hi"));
            }
            _ => panic!("expected a PUB"),
        }
        assert_eq!(
            Op::parse(b"PUB foo 2\r\nhiya\r\n").unwrap_err(),
            ProtoError::MissingPayloadTerminator
        );
        assert_eq!(
            Op::parse(b"PUB foo two\r\nhi\r\n").unwrap_err(),
            ProtoError::BadPayloadLength("two".to_owned())
        );
    }
    #[test]
    fn test_msg_length_limits() {
        assert_eq!(
            Op::parse(b"MSG foo 1 18446744073709551615\r\n").unwrap_err(),
            ProtoError::PayloadTooLarge {
                len: usize::MAX,
                max: MAX_PAYLOAD
            }
        );
        assert_eq!(
            Op::parse(b"MSG foo 1 999999999999\r\n").unwrap_err(),
            ProtoError::PayloadTooLarge {
                len: 999_999_999_999,
                max: MAX_PAYLOAD
            }
        );
        assert_eq!(
            Op::parse_limited(b"MSG foo 1 65\r\n", 64).unwrap_err(),
            ProtoError::PayloadTooLarge { len: 65, max: 64 }
        );
        assert!(matches!(
            Op::parse_limited(b"MSG foo 1 64\r\n", 64),
            Err(ProtoError::InsufficientBuffer { .. })
        ));
        assert_eq!(
            Op::parse(b"PUB foo 18446744073709551616\r\n").unwrap_err(),
            ProtoError::BadPayloadLength("18446744073709551616".to_owned())
        );
    }
    #[test]
    fn test_info() {
        let wire = b"INFO {\"server_id\":\"x\",\"max_payload\":512}\r\n";
        let (op, len) = Op::parse(wire).unwrap();
        assert_eq!(len, wire.len());
        match op {
            Op::Info(i) => {
                assert_eq!(i.server_id, "x");
                assert_eq!(i.max_payload, 512);
            }
            _ => panic!("expected an INFO"),
        }
    }
    #[test]
    fn test_unknown_and_oversized() {
        assert_eq!(
            Op::parse(b"HELLO\r\n").unwrap_err(),
            ProtoError::UnknownOp("HELLO".to_owned())
        );
        let garbage = vec![b'x'; MAX_CONTROL_LINE + 1];
        assert_eq!(
            Op::parse(&garbage).unwrap_err(),
            ProtoError::ControlLineTooLong(MAX_CONTROL_LINE)
        );
    }
}
