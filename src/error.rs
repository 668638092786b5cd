//! Error types for framed-jsonrpc.
//!
//! Errors are layered: [`CodecError`] for framing/decoding violations,
//! [`EndpointError`] for transport and lifecycle failures, and [`RpcError`]
//! for failures the peer reported inside a well-formed response.

use thiserror::Error;

/// Framing and decoding errors raised below the dispatch layer.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The byte stream violated the active framing (malformed length header,
    /// partial frame still buffered when the idle timer fired).
    #[error("bad framing")]
    BadFraming,

    /// A complete frame was extracted but its payload was not the expected
    /// JSON record.
    #[error("bad JSON payload: {0}")]
    BadJson(#[source] serde_json::Error),

    /// The cumulation buffer reached the per-frame payload cap without a
    /// completed frame.
    #[error("request too large")]
    RequestTooLarge,
}

/// Transport and lifecycle errors surfaced to endpoint callers.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing or decoding failure on an established connection.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The endpoint is not in a state that allows the operation
    /// (e.g. `stop` before the server reached started).
    #[error("endpoint not ready")]
    NotReady,

    /// Binding the listener socket failed.
    #[error("cannot bind: {0}")]
    CantBind(#[source] std::io::Error),

    /// The inbound idle timer elapsed with no reads.
    #[error("read timeout")]
    Timeout,

    /// The peer closed or reset the connection while calls were pending.
    #[error("connection reset by peer")]
    ConnectionResetByPeer,

    /// The local endpoint was shut down while the operation was in flight.
    #[error("endpoint closed")]
    Closed,
}

/// Classification of a peer-reported RPC failure, derived from the wire
/// error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// The peer rejected the method name (-32601).
    InvalidMethod,
    /// The peer rejected the call parameters (-32602).
    InvalidParams,
    /// The request was structurally invalid or oversized (-32600).
    InvalidRequest,
    /// The peer's response could not be understood (-32700, or a response
    /// carrying neither result nor error).
    InvalidServerResponse,
    /// Internal error or any unrecognized code (-32603 and others).
    OtherServerError,
}

/// A peer-reported RPC failure, as surfaced to `call` users.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {description}")]
pub struct RpcError {
    /// Failure classification.
    pub kind: RpcErrorKind,
    /// The `message` field of the wire error object.
    pub description: String,
}

impl RpcError {
    /// Create an error with the given kind and description.
    pub fn new(kind: RpcErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// Error type returned by [`Client::call`](crate::Client::call).
///
/// `Rpc` means the peer answered this call with an error object or an
/// undecodable response; `Endpoint` means the call never completed because
/// the connection failed underneath it.
#[derive(Debug, Error)]
pub enum CallError {
    /// The peer reported a failure for this specific call.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The connection failed before the call completed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Result alias for endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;
