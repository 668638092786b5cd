//! Codec module - framing and record encoding for the byte stream.
//!
//! Three interchangeable framers split the inbound stream into whole JSON
//! frames, each pulling from a cumulation buffer that retains unconsumed
//! bytes across reads:
//!
//! - [`NewlineFramer`] - frames delimited by `\r\n`
//! - [`LengthPrefixedFramer`] - `8-hex-digit length : payload \n`
//! - [`BruteForceFramer`] - no delimiter; JSON boundary probing
//!
//! [`RecordCodec`] bridges frames to typed records in both directions.
//! Outbound, [`Framing::encode`] produces one contiguous buffer per frame so
//! a frame is always a single write and a single flush, and concurrent
//! writers can never interleave partial frames.

mod brute;
mod length;
mod newline;
mod record;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;

pub use brute::BruteForceFramer;
pub use length::LengthPrefixedFramer;
pub use newline::NewlineFramer;
pub use record::RecordCodec;

use crate::error::{CodecError, CodecResult};

/// Per-frame payload cap. A cumulation buffer reaching this size without a
/// completed frame is fatal to the connection.
pub const MAX_PAYLOAD: usize = 1_000_000;

/// Framing variant, selectable per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Frames terminated by the two-byte sequence `\r\n`.
    #[default]
    Newline,
    /// `llllllll:<payload>\n` with an 8-hex-digit payload length.
    LengthPrefixed,
    /// One JSON document per frame with no trailer; boundaries found by
    /// attempting a decode whenever the buffer ends in `}`.
    BruteForce,
}

impl Framing {
    /// Append one framed payload to `dst`.
    pub fn encode(&self, payload: &[u8], dst: &mut BytesMut) {
        match self {
            Framing::Newline => newline::encode(payload, dst),
            Framing::LengthPrefixed => length::encode(payload, dst),
            Framing::BruteForce => dst.extend_from_slice(payload),
        }
    }

    /// Build the stream decoder for this variant. `T` is the record type the
    /// brute-force variant probes for; the other variants ignore it.
    pub(crate) fn decoder<T>(&self) -> Box<dyn FrameDecoder>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self {
            Framing::Newline => Box::new(NewlineFramer::new()),
            Framing::LengthPrefixed => Box::new(LengthPrefixedFramer::new()),
            Framing::BruteForce => Box::new(BruteForceFramer::<T>::new()),
        }
    }
}

/// Stream-oriented frame decoder over a cumulation buffer.
///
/// `decode` is invoked whenever new bytes arrive and retried against the
/// remainder after every emitted frame, so a single read can yield several
/// frames. Unconsumed bytes stay in `buf` for the next read.
pub trait FrameDecoder: Send {
    /// Pull the next complete frame out of the buffer.
    ///
    /// Returns `Ok(Some(frame))` when a frame was delimited (the frame and
    /// its framing overhead are consumed from `buf`), `Ok(None)` when more
    /// bytes are needed, and `Err` on a framing violation or an oversized
    /// frame.
    fn decode(&mut self, buf: &mut BytesMut) -> CodecResult<Option<Bytes>>;

    /// Called when the idle timer fires while `buf` still holds bytes.
    ///
    /// A partial frame that never completed is treated as malformed; the
    /// brute-force framer overrides this to tolerate mid-decode idleness.
    fn on_idle(&self, buf: &BytesMut) -> CodecResult<()> {
        if buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::BadFraming)
        }
    }
}
