//! Brute-force framer: JSON boundary detection without a delimiter.
//!
//! Exists for peers that send one JSON document per frame with no trailer
//! (lightsd-style endpoints). Whenever the buffer ends in `}`, a streaming
//! deserialize of the expected record type runs against the front of the
//! buffer; on success exactly the bytes that document consumed are emitted
//! as the frame, so two documents coalesced into one read still split
//! cleanly at the boundary. An incomplete document (a `}` inside a string,
//! a truncated object) leaves the buffer untouched until more bytes
//! arrive.
//!
//! The payload-size check takes precedence over the wait-for-more-data
//! rule, so a huge malformed blob with a trailing `}` still kills the
//! connection with `RequestTooLarge`.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;

use super::{FrameDecoder, MAX_PAYLOAD};
use crate::error::{CodecError, CodecResult};

/// Stream decoder that finds frame boundaries by attempting to decode the
/// record type `T`.
#[derive(Debug)]
pub struct BruteForceFramer<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> BruteForceFramer<T> {
    /// Create a new framer probing for `T`.
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for BruteForceFramer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameDecoder for BruteForceFramer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn decode(&mut self, buf: &mut BytesMut) -> CodecResult<Option<Bytes>> {
        if buf.len() >= MAX_PAYLOAD {
            return Err(CodecError::RequestTooLarge);
        }
        if buf.last() != Some(&b'}') {
            return Ok(None);
        }

        // A streaming deserialize stops at the end of the first document,
        // so bytes past it (the next frame) are not treated as an error.
        let mut stream = serde_json::Deserializer::from_slice(buf).into_iter::<T>();
        match stream.next() {
            Some(Ok(_)) => {
                let consumed = stream.byte_offset();
                Ok(Some(buf.split_to(consumed).freeze()))
            }
            // An unterminated or not-yet-well-formed document: more bytes
            // may complete the value.
            Some(Err(e)) if e.is_eof() || e.is_syntax() => Ok(None),
            Some(Err(e)) => Err(CodecError::BadJson(e)),
            None => Ok(None),
        }
    }

    /// Mid-decode idleness is tolerated; the buffered prefix may still be
    /// completed by the peer's next write.
    fn on_idle(&self, _buf: &BytesMut) -> CodecResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Request, Response};

    #[test]
    fn test_single_document_no_trailer() {
        let mut framer = BruteForceFramer::<Request>::new();
        let wire = br#"{"jsonrpc":"2.0","id":"1","method":"m","params":{}}"#;
        let mut buf = BytesMut::from(&wire[..]);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &wire[..]);
        assert!(buf.is_empty());

        // exactly once: nothing left to emit
        assert!(framer.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_concatenated_documents_split_at_boundary() {
        let mut framer = BruteForceFramer::<Request>::new();
        let first = br#"{"jsonrpc":"2.0","id":"1","method":"a"}"#;
        let second = br#"{"jsonrpc":"2.0","id":"2","method":"b","params":{}}"#;

        // both frames coalesced into one read
        let mut buf = BytesMut::new();
        buf.extend_from_slice(first);
        buf.extend_from_slice(second);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &first[..]);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &second[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_complete_document_followed_by_partial() {
        let mut framer = BruteForceFramer::<Response>::new();
        let first = br#"{"jsonrpc":"2.0","id":"1","result":1}"#;
        let second = br#"{"jsonrpc":"2.0","id":"2","result":{}}"#;

        let mut buf = BytesMut::new();
        buf.extend_from_slice(first);
        // the partial tail happens to end in '}' (the result object)
        buf.extend_from_slice(&second[..second.len() - 1]);

        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &first[..]);
        assert!(framer.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&second[second.len() - 1..]);
        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &second[..]);
    }

    #[test]
    fn test_inner_closing_brace_does_not_frame_early() {
        let mut framer = BruteForceFramer::<Request>::new();
        let full = br#"{"jsonrpc":"2.0","id":"1","method":"m","params":{"a":{}}}"#;

        // stop right after the params object's closing braces
        let cut = full.len() - 1;
        let mut buf = BytesMut::from(&full[..cut]);
        assert!(framer.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[cut..]);
        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &full[..]);
    }

    #[test]
    fn test_brace_inside_string_is_pending() {
        let mut framer = BruteForceFramer::<Request>::new();
        // ends in '}' but the document is still inside a string literal
        let mut buf = BytesMut::from(&br#"{"jsonrpc":"2.0","id":"1","method":"}"#[..]);
        assert!(framer.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(br#"","params":null}"#);
        assert!(framer.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_waits_until_last_byte_is_brace() {
        let mut framer = BruteForceFramer::<Response>::new();
        let mut buf = BytesMut::from(&br#"{"jsonrpc":"2.0","id":"1","result":3"#[..]);
        assert!(framer.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"}");
        let frame = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], br#"{"jsonrpc":"2.0","id":"1","result":3}"#);
    }

    #[test]
    fn test_size_check_precedes_decode_probe() {
        let mut framer = BruteForceFramer::<Request>::new();
        let mut blob = vec![b'{'; MAX_PAYLOAD - 1];
        blob.push(b'}');
        let mut buf = BytesMut::from(&blob[..]);
        assert!(matches!(
            framer.decode(&mut buf),
            Err(CodecError::RequestTooLarge)
        ));
    }
}
