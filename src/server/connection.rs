//! Per-connection inbound loop for the server endpoint.
//!
//! Bytes flow read -> framer -> record decode -> handler dispatch. Each
//! request is dispatched on its own task, so replies may complete out of
//! request order while dispatch itself preserves arrival order. A framing
//! or decode violation is answered with an id-`"unknown"` error response
//! and then the connection is closed once that response has been flushed.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::codec::{Framing, RecordCodec};
use crate::error::{CodecError, EndpointError};
use crate::handler::{Handler, Responder};
use crate::protocol::{ErrorObject, Request, Response, RpcValue, UNKNOWN_ID};
use crate::writer::{spawn_writer_task, WriterHandle};

const READ_BUF_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy)]
pub(crate) struct ConnectionConfig {
    pub framing: Framing,
    pub idle_timeout: Duration,
}

/// Drive one accepted connection to completion.
pub(crate) async fn run(
    stream: TcpStream,
    handler: Arc<dyn Handler>,
    config: ConnectionConfig,
) {
    let peer = stream.peer_addr().ok();
    let (mut reader, write_half) = stream.into_split();
    let (writer, writer_task) = spawn_writer_task(write_half);

    match read_loop(&mut reader, &handler, &writer, config).await {
        Ok(()) => {
            tracing::debug!(?peer, "peer closed connection");
        }
        Err(error) => {
            tracing::debug!(?peer, %error, "closing connection after error");
            let response = error_response(&error);
            if let Ok(payload) = RecordCodec::encode(&response) {
                let mut framed = BytesMut::with_capacity(payload.len() + 16);
                config.framing.encode(&payload, &mut framed);
                let _ = writer.send(framed.freeze()).await;
            }
            // flush the error response before the socket goes away
            writer.shutdown().await;
            let _ = writer_task.await;
        }
    }
}

async fn read_loop(
    reader: &mut OwnedReadHalf,
    handler: &Arc<dyn Handler>,
    writer: &WriterHandle,
    config: ConnectionConfig,
) -> Result<(), EndpointError> {
    let mut decoder = config.framing.decoder::<Request>();
    let mut cumulation = BytesMut::with_capacity(8 * 1024);
    let mut read_buf = vec![0u8; READ_BUF_SIZE];

    loop {
        // the idle timer resets on every inbound read, not on frame completion
        let n = match timeout(config.idle_timeout, reader.read(&mut read_buf)).await {
            Err(_) => {
                decoder.on_idle(&cumulation)?;
                return Err(EndpointError::Timeout);
            }
            Ok(Ok(0)) => return Ok(()),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(EndpointError::Io(e)),
        };

        cumulation.extend_from_slice(&read_buf[..n]);
        while let Some(frame) = decoder.decode(&mut cumulation)? {
            let request: Request = RecordCodec::decode(&frame)?;
            dispatch(request, handler, writer, config.framing);
        }
    }
}

/// Hand one decoded request to the handler on its own task.
fn dispatch(
    request: Request,
    handler: &Arc<dyn Handler>,
    writer: &WriterHandle,
    framing: Framing,
) {
    let responder = Responder::new(request.id.clone(), framing, writer.clone());

    // structurally invalid requests are answered without reaching the
    // handler; the connection itself stays up
    if let Err(error) = request.validate() {
        tracing::debug!(id = %request.id, "rejecting invalid request");
        tokio::spawn(async move {
            let _ = responder.fail(error).await;
        });
        return;
    }

    let params = RpcValue::from(request.params);
    let future = handler.handle(&request.method, params, responder);
    tokio::spawn(future);
}

fn error_response(error: &EndpointError) -> Response {
    let object = match error {
        EndpointError::Codec(CodecError::BadFraming)
        | EndpointError::Codec(CodecError::BadJson(_)) => {
            ErrorObject::parse_error(error.to_string())
        }
        EndpointError::Codec(CodecError::RequestTooLarge) => {
            ErrorObject::invalid_request(error.to_string())
        }
        other => ErrorObject::internal_error(other.to_string()),
    };
    Response::failure(UNKNOWN_ID, object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;

    #[test]
    fn test_codec_errors_map_to_parse_error() {
        let bad_json = serde_json::from_str::<Request>("notjson").unwrap_err();
        for error in [
            EndpointError::Codec(CodecError::BadFraming),
            EndpointError::Codec(CodecError::BadJson(bad_json)),
        ] {
            let response = error_response(&error);
            assert_eq!(response.id, UNKNOWN_ID);
            assert_eq!(response.error.unwrap().code, codes::PARSE_ERROR);
        }
    }

    #[test]
    fn test_oversize_maps_to_invalid_request() {
        let error = EndpointError::Codec(CodecError::RequestTooLarge);
        let response = error_response(&error);
        assert_eq!(response.error.unwrap().code, codes::INVALID_REQUEST);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let response = error_response(&EndpointError::Timeout);
        assert_eq!(response.id, UNKNOWN_ID);
        assert_eq!(response.error.unwrap().code, codes::INTERNAL_ERROR);
    }
}
