//! Length-prefixed framer.
//!
//! Wire format, byte exact: 8 hex digits encoding the payload length
//! (lowercase on write, either case accepted on read), one colon, the
//! payload, one newline. Total frame size is payload length + 10.

use std::fmt::Write as _;

use bytes::{Buf, Bytes, BytesMut};

use super::{FrameDecoder, MAX_PAYLOAD};
use crate::error::{CodecError, CodecResult};

const HEADER_LEN: usize = 9;
const OVERHEAD: usize = 10;

/// Stream decoder for length-prefixed frames.
#[derive(Debug, Default)]
pub struct LengthPrefixedFramer;

impl LengthPrefixedFramer {
    /// Create a new framer.
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for LengthPrefixedFramer {
    fn decode(&mut self, buf: &mut BytesMut) -> CodecResult<Option<Bytes>> {
        if buf.len() >= MAX_PAYLOAD {
            return Err(CodecError::RequestTooLarge);
        }
        if buf.len() < OVERHEAD {
            return Ok(None);
        }

        let len = parse_hex_len(&buf[..8])?;
        if buf[8] != b':' {
            return Err(CodecError::BadFraming);
        }

        let total = len + OVERHEAD;
        if buf.len() < total || buf[total - 1] != b'\n' {
            return Ok(None);
        }

        let mut frame = buf.split_to(total);
        frame.advance(HEADER_LEN);
        frame.truncate(len);
        Ok(Some(frame.freeze()))
    }
}

fn parse_hex_len(digits: &[u8]) -> CodecResult<usize> {
    if !digits.iter().all(|b| b.is_ascii_hexdigit()) {
        return Err(CodecError::BadFraming);
    }
    let text = std::str::from_utf8(digits).map_err(|_| CodecError::BadFraming)?;
    usize::from_str_radix(text, 16).map_err(|_| CodecError::BadFraming)
}

/// Append `llllllll:<payload>\n` with a lowercase, zero-padded hex length.
pub(super) fn encode(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + OVERHEAD);
    let mut header = String::with_capacity(HEADER_LEN);
    let _ = write!(header, "{:08x}:", payload.len());
    dst.extend_from_slice(header.as_bytes());
    dst.extend_from_slice(payload);
    dst.extend_from_slice(b"\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_byte_exact() {
        let mut buf = BytesMut::new();
        encode(br#"{"a":1}"#, &mut buf);
        assert_eq!(&buf[..], b"00000007:{\"a\":1}\n");
    }

    #[test]
    fn test_decode_recovers_payload_exactly() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&b"00000007:{\"a\":1}\n"[..]);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], br#"{"a":1}"#);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&b"0000000A:0123456789\n"[..]);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"0123456789");
    }

    #[test]
    fn test_non_hex_length_is_bad_framing() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&b"0000zz07:{\"a\":1}\n"[..]);
        assert!(matches!(
            framer.decode(&mut buf),
            Err(CodecError::BadFraming)
        ));
    }

    #[test]
    fn test_missing_colon_is_bad_framing() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&b"00000007;{\"a\":1}\n"[..]);
        assert!(matches!(
            framer.decode(&mut buf),
            Err(CodecError::BadFraming)
        ));
    }

    #[test]
    fn test_short_buffer_waits() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&b"00000007:"[..]);
        assert!(framer.decode(&mut buf).unwrap().is_none());

        // header complete, payload still short of LEN + 10
        buf.extend_from_slice(b"{\"a\":1}");
        assert!(framer.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], br#"{"a":1}"#);
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut wire = BytesMut::new();
        encode(b"", &mut wire);
        assert_eq!(&wire[..], b"00000000:\n");

        let mut framer = LengthPrefixedFramer::new();
        let frame = framer.decode(&mut wire).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut wire = BytesMut::new();
        encode(b"one", &mut wire);
        encode(b"two", &mut wire);

        let mut framer = LengthPrefixedFramer::new();
        let first = framer.decode(&mut wire).unwrap().unwrap();
        let second = framer.decode(&mut wire).unwrap().unwrap();
        assert_eq!(&first[..], b"one");
        assert_eq!(&second[..], b"two");
        assert!(framer.decode(&mut wire).unwrap().is_none());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut wire = BytesMut::new();
        encode(br#"{"id":"1"}"#, &mut wire);

        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for byte in wire.iter() {
            buf.extend_from_slice(&[*byte]);
            while let Some(frame) = framer.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], br#"{"id":"1"}"#);
    }

    #[test]
    fn test_oversize_is_fatal() {
        let mut framer = LengthPrefixedFramer::new();
        let mut buf = BytesMut::from(&vec![b'0'; MAX_PAYLOAD][..]);
        assert!(matches!(
            framer.decode(&mut buf),
            Err(CodecError::RequestTooLarge)
        ));
    }
}
