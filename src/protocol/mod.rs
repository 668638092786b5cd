//! Protocol module - the JSON-RPC 2.0 data model.
//!
//! - [`RpcValue`] - sum type covering every JSON argument/result value
//! - [`Request`] / [`Response`] / [`ErrorObject`] - the wire records
//! - [`codes`] - well-known JSON-RPC error codes

mod message;
mod value;

pub use message::{codes, ErrorObject, Request, Response, UNKNOWN_ID, VERSION};
pub use value::RpcValue;
