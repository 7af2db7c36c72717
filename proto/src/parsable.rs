use crate::error::ProtoError;
use bytes::{BufMut, Bytes};

pub const CRLF: &[u8] = b"\r\n";

/// The broker drops clients whose control line grows past this many bytes
/// without a terminating CRLF.
pub const MAX_CONTROL_LINE: usize = 4096;

/// Hard ceiling a NATS server accepts for `max_payload`.
pub const MAX_PAYLOAD: usize = 64 * 1024 * 1024;

pub trait Parsable {
    /// Serialize `self`, including the trailing CRLF, into `buf`
    fn serialize<T: BufMut>(&self, buf: &mut T) -> Result<(), ProtoError>;
    /// Returns the number of bytes `serialize` writes
    fn size(&self) -> usize;
}

/// Position of the first CRLF in `buf`.
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Splits a control line into its verb and the (untrimmed) rest.
pub(crate) fn split_verb(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.find(|c: char| c.is_ascii_whitespace()) {
        Some(i) => (&line[..i], &line[i..]),
        None => (line, ""),
    }
}

pub(crate) fn fields(args: &str) -> Vec<&str> {
    args.split_ascii_whitespace().collect()
}

pub(crate) fn parse_len(field: &str) -> Result<usize, ProtoError> {
    field
        .parse()
        .map_err(|_| ProtoError::BadPayloadLength(field.to_owned()))
}

pub(crate) fn parse_sid(op: &'static str, field: &str, args: &str) -> Result<u64, ProtoError> {
    field.parse().map_err(|_| ProtoError::BadArguments {
        op,
        args: args.trim().to_owned(),
    })
}

/// Copies out a `len` bytes payload starting at `start`, returns it with the
/// offset just past its CRLF terminator. Lengths above `max` are refused
/// before anything is buffered for them.
pub(crate) fn take_payload(
    buf: &[u8],
    start: usize,
    len: usize,
    max: usize,
) -> Result<(Bytes, usize), ProtoError> {
    if len > max {
        return Err(ProtoError::PayloadTooLarge { len, max });
    }
    let needed = start
        .checked_add(len)
        .and_then(|n| n.checked_add(CRLF.len()))
        .ok_or_else(|| ProtoError::BadPayloadLength(len.to_string()))?;
    if buf.len() < needed {
        return Err(ProtoError::InsufficientBuffer {
            needed,
            available: buf.len(),
        });
    }
    if &buf[start + len..needed] != CRLF {
        return Err(ProtoError::MissingPayloadTerminator);
    }
    Ok((Bytes::copy_from_slice(&buf[start..start + len]), needed))
}

pub(crate) fn put_decimal<T: BufMut>(buf: &mut T, n: u64) {
    buf.put_slice(n.to_string().as_bytes());
}

pub(crate) fn decimal_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}
