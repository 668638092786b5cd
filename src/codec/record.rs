//! Codable codec - bridges byte frames and typed records.
//!
//! Inbound frames decode as UTF-8 JSON into the configured record type
//! (requests on the server, responses on the client); failures are wrapped
//! as `BadJson`. By the time a decode fails the framer has already consumed
//! the frame's bytes, so the stream itself stays aligned at the next frame
//! boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};

/// JSON record codec.
pub struct RecordCodec;

impl RecordCodec {
    /// Decode a frame into a typed record.
    pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> CodecResult<T> {
        serde_json::from_slice(frame).map_err(CodecError::BadJson)
    }

    /// Encode a record to UTF-8 JSON bytes.
    pub fn encode<T: Serialize>(record: &T) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(CodecError::BadJson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Request, Response};
    use serde_json::json;

    #[test]
    fn test_request_round_trip() {
        let request = Request::new("1", "add", json!([1, 2]));
        let bytes = RecordCodec::encode(&request).unwrap();
        let back: Request = RecordCodec::decode(&bytes).unwrap();

        assert_eq!(back.id, "1");
        assert_eq!(back.method, "add");
        assert_eq!(back.params, json!([1, 2]));
    }

    #[test]
    fn test_response_round_trip_preserves_discriminant() {
        let response = Response::success("7", json!({"ok": true}));
        let bytes = RecordCodec::encode(&response).unwrap();
        let back: Response = RecordCodec::decode(&bytes).unwrap();

        assert_eq!(back.id, "7");
        assert!(back.result.is_some());
        assert!(back.error.is_none());
    }

    #[test]
    fn test_garbage_frame_is_bad_json() {
        let result: CodecResult<Request> = RecordCodec::decode(b"notjson");
        assert!(matches!(result, Err(CodecError::BadJson(_))));
    }

    #[test]
    fn test_wrong_shape_is_bad_json() {
        // well-formed JSON, wrong record shape
        let result: CodecResult<Request> = RecordCodec::decode(br#"{"x":1}"#);
        assert!(matches!(result, Err(CodecError::BadJson(_))));
    }
}
