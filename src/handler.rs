//! Handler module - the server-side request capability.
//!
//! A [`Handler`] receives `(method, params, responder)` for every inbound
//! request and completes the [`Responder`] exactly once, synchronously or
//! later from another task. Replies may be issued out of request order;
//! each response travels back under the id of the request that produced it.
//!
//! # Example
//!
//! ```ignore
//! use framed_jsonrpc::{service_fn, ErrorObject, Responder, RpcValue};
//!
//! let handler = service_fn(|method: String, params: RpcValue, responder: Responder| async move {
//!     match method.as_str() {
//!         "echo" => responder.succeed(params).await,
//!         _ => responder.fail(ErrorObject::method_not_found(&method)).await,
//!     }
//! });
//! ```

use std::future::Future;
use std::pin::Pin;

use bytes::BytesMut;

use crate::codec::{Framing, RecordCodec};
use crate::error::Result;
use crate::protocol::{ErrorObject, Response, RpcValue};
use crate::writer::WriterHandle;

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// User-supplied request handler.
pub trait Handler: Send + Sync + 'static {
    /// Handle one inbound request.
    ///
    /// `responder` must be completed exactly once; consuming it enforces
    /// that. Returning without completing it leaves the call unanswered.
    fn handle(&self, method: &str, params: RpcValue, responder: Responder)
        -> BoxFuture<'static, ()>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct ServiceFn<F> {
    f: F,
}

/// Wrap a `(method, params, responder)` closure as a [`Handler`].
pub fn service_fn<F, Fut>(f: F) -> ServiceFn<F>
where
    F: Fn(String, RpcValue, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    ServiceFn { f }
}

impl<F, Fut> Handler for ServiceFn<F>
where
    F: Fn(String, RpcValue, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, method: &str, params: RpcValue, responder: Responder)
        -> BoxFuture<'static, ()> {
        Box::pin((self.f)(method.to_string(), params, responder))
    }
}

/// Write-once reply handle for a single request.
///
/// Carries the request id; the response it produces is framed into one
/// contiguous buffer and queued on the connection's writer, so replies from
/// concurrent handlers never interleave mid-frame.
pub struct Responder {
    id: String,
    framing: Framing,
    writer: WriterHandle,
}

impl Responder {
    pub(crate) fn new(id: String, framing: Framing, writer: WriterHandle) -> Self {
        Self { id, framing, writer }
    }

    /// The id of the request being answered.
    pub fn request_id(&self) -> &str {
        &self.id
    }

    /// Complete the call with a result.
    pub async fn succeed(self, result: RpcValue) -> Result<()> {
        let response = Response::success(self.id.clone(), result.into());
        self.write(response).await
    }

    /// Complete the call with an error object.
    pub async fn fail(self, error: ErrorObject) -> Result<()> {
        let response = Response::failure(self.id.clone(), error);
        self.write(response).await
    }

    async fn write(self, response: Response) -> Result<()> {
        let payload = RecordCodec::encode(&response)?;
        let mut framed = BytesMut::with_capacity(payload.len() + 16);
        self.framing.encode(&payload, &mut framed);
        self.writer.send(framed.freeze()).await
    }
}
