//! JSON-RPC 2.0 wire records.
//!
//! Every payload is a single JSON object with `"jsonrpc": "2.0"`. Requests
//! carry `id`, `method` and optional `params`; responses carry `id` and
//! exactly one of `result` or `error`. Absent fields are omitted from the
//! serialized output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RpcError, RpcErrorKind};
use crate::protocol::RpcValue;

/// Protocol version, always emitted and always verified on receipt.
pub const VERSION: &str = "2.0";

/// Id substituted when the server cannot correlate a response to a request
/// (malformed frame, or an inbound request that carried no id).
pub const UNKNOWN_ID: &str = "unknown";

/// Well-known JSON-RPC 2.0 error codes.
pub mod codes {
    /// Malformed frame or JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Oversized or structurally invalid request.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The handler rejected the method name.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// The handler rejected the parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// The handler raised.
    pub const INTERNAL_ERROR: i64 = -32603;
}

fn unknown_id() -> String {
    UNKNOWN_ID.to_string()
}

/// An inbound or outbound JSON-RPC request.
///
/// The library never emits notifications; an inbound request without an id
/// decodes with id [`UNKNOWN_ID`] and is answered under that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id, unique per connection within the pending window.
    #[serde(default = "unknown_id")]
    pub id: String,
    /// Method name.
    pub method: String,
    /// Call arguments; omitted from output when null.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Build a request with the protocol version filled in.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Receive-side validation: version string, non-empty method and id.
    pub fn validate(&self) -> Result<(), ErrorObject> {
        if self.jsonrpc != VERSION {
            return Err(ErrorObject::invalid_request("unsupported jsonrpc version"));
        }
        if self.method.is_empty() {
            return Err(ErrorObject::invalid_request("empty method"));
        }
        if self.id.is_empty() {
            return Err(ErrorObject::invalid_request("empty id"));
        }
        Ok(())
    }
}

/// A JSON-RPC response: `id` plus exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id echoed from the request, or [`UNKNOWN_ID`].
    #[serde(default = "unknown_id")]
    pub id: String,
    /// Success payload; omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload; omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Build a success response carrying `result`.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Build a failure response carrying `error`.
    pub fn failure(id: impl Into<String>, error: ErrorObject) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Convert into the user-facing call result.
    ///
    /// A `result` field produces success; an `error` field produces a failure
    /// whose kind derives from the wire code; a response carrying neither is
    /// itself invalid.
    pub fn into_result(self) -> Result<RpcValue, RpcError> {
        if let Some(result) = self.result {
            return Ok(RpcValue::from(result));
        }
        if let Some(error) = self.error {
            return Err(RpcError::new(kind_for_code(error.code), error.message));
        }
        Err(RpcError::new(
            RpcErrorKind::InvalidServerResponse,
            "response carried neither result nor error",
        ))
    }
}

fn kind_for_code(code: i64) -> RpcErrorKind {
    match code {
        codes::INVALID_REQUEST => RpcErrorKind::InvalidRequest,
        codes::METHOD_NOT_FOUND => RpcErrorKind::InvalidMethod,
        codes::INVALID_PARAMS => RpcErrorKind::InvalidParams,
        codes::PARSE_ERROR => RpcErrorKind::InvalidServerResponse,
        _ => RpcErrorKind::OtherServerError,
    }
}

/// The `error` member of a failure response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail; omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// `-32700` malformed frame or JSON.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: message.into(),
            data: None,
        }
    }

    /// `-32600` oversized or structurally invalid request.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    /// `-32601` unknown method.
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("method not found: {}", method),
            data: None,
        }
    }

    /// `-32602` rejected parameters.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }

    /// `-32603` handler failure.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }
}
