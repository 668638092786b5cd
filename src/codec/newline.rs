//! Newline framer: frames delimited by `\r\n`.
//!
//! The delimiter is consumed but not included in the emitted frame. The
//! minimum viable buffer is 3 bytes (one payload byte plus CR LF); anything
//! shorter waits for more data.

use bytes::{Buf, Bytes, BytesMut};

use super::{FrameDecoder, MAX_PAYLOAD};
use crate::error::{CodecError, CodecResult};

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;

/// Stream decoder for `\r\n`-delimited frames.
#[derive(Debug, Default)]
pub struct NewlineFramer;

impl NewlineFramer {
    /// Create a new framer.
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for NewlineFramer {
    fn decode(&mut self, buf: &mut BytesMut) -> CodecResult<Option<Bytes>> {
        if buf.len() >= MAX_PAYLOAD {
            return Err(CodecError::RequestTooLarge);
        }
        if buf.len() < 3 {
            return Ok(None);
        }

        for i in 1..buf.len() {
            if buf[i - 1] == CR && buf[i] == LF {
                let frame = buf.split_to(i - 1).freeze();
                buf.advance(2);
                return Ok(Some(frame));
            }
        }

        Ok(None)
    }
}

/// Append the payload followed by `\r\n`.
pub(super) fn encode(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + 2);
    dst.extend_from_slice(payload);
    dst.extend_from_slice(b"\r\n");
}
