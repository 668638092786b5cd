//! # framed-jsonrpc
//!
//! Symmetric JSON-RPC 2.0 client and server endpoints over framed TCP
//! streams.
//!
//! Peers exchange JSON-encoded requests and responses over a byte stream
//! split into frames by one of three interchangeable framers. Inbound, each
//! connection runs a linear pipeline: an idle monitor, the framer pulling
//! whole frames out of a cumulation buffer, a record codec decoding frames
//! into typed messages, and an endpoint stage - the server dispatches
//! requests to a user handler, the client matches responses against its
//! pending calls.
//!
//! ## Server
//!
//! ```ignore
//! use framed_jsonrpc::{service_fn, ErrorObject, Responder, RpcValue, Server};
//!
//! let server = Server::builder()
//!     .bind(
//!         "127.0.0.1:9000".parse()?,
//!         service_fn(|method: String, params: RpcValue, responder: Responder| async move {
//!             match method.as_str() {
//!                 "echo" => { let _ = responder.succeed(params).await; }
//!                 _ => { let _ = responder.fail(ErrorObject::method_not_found(&method)).await; }
//!             }
//!         }),
//!     )
//!     .await?;
//! // ...
//! server.stop().await?;
//! ```
//!
//! ## Client
//!
//! ```ignore
//! use framed_jsonrpc::{Client, RpcValue};
//!
//! let client = Client::builder().connect("127.0.0.1:9000".parse()?).await?;
//! let echoed = client.call("echo", RpcValue::from("hi")).await?;
//! client.disconnect().await?;
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod protocol;

mod client;
mod server;
mod writer;

pub use client::{Client, ClientBuilder};
pub use codec::Framing;
pub use error::{CallError, CodecError, EndpointError, RpcError, RpcErrorKind};
pub use handler::{service_fn, Handler, Responder};
pub use protocol::{ErrorObject, Request, Response, RpcValue};
pub use server::{Server, ServerBuilder, DEFAULT_BACKLOG, DEFAULT_TIMEOUT};
