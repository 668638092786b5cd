//! Client connection task.
//!
//! One task per connection owns every piece of mutable state: the
//! cumulation buffer, the pending-call table, and the write half. `call`
//! submissions hop onto it through a command channel, so requests are
//! written in submission order and responses are correlated without locks.
//!
//! Responses are matched by wire id against the pending table; a FIFO
//! queue of ids is kept alongside so that teardown and per-call error
//! paths drain oldest-first.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::codec::{FrameDecoder, Framing, RecordCodec};
use crate::error::{CodecError, EndpointError};
use crate::protocol::{ErrorObject, Request, Response};

const READ_BUF_SIZE: usize = 64 * 1024;

type ReplySlot = oneshot::Sender<Result<Response, EndpointError>>;

pub(crate) enum Command {
    Call {
        request: Request,
        reply: ReplySlot,
    },
    Disconnect,
}

#[derive(Clone, Copy)]
pub(crate) struct ConnectionConfig {
    pub framing: Framing,
    pub idle_timeout: Duration,
}

/// Drive the connection until disconnect, peer close, or a fatal error.
pub(crate) async fn run(
    stream: TcpStream,
    mut commands: mpsc::Receiver<Command>,
    config: ConnectionConfig,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut decoder = config.framing.decoder::<Response>();
    let mut cumulation = BytesMut::with_capacity(8 * 1024);
    let mut read_buf = vec![0u8; READ_BUF_SIZE];
    let mut pending = PendingCalls::new();
    let mut read_deadline = Instant::now() + config.idle_timeout;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Call { request, reply }) => {
                    if pending.is_empty() {
                        read_deadline = Instant::now() + config.idle_timeout;
                    }
                    match write_request(&mut writer, &request, config.framing).await {
                        Ok(()) => pending.push(request.id, reply),
                        Err(error) => {
                            let _ = reply.send(Err(error));
                        }
                    }
                }
                Some(Command::Disconnect) | None => {
                    pending.drain(|| EndpointError::Closed);
                    break;
                }
            },
            read = reader.read(&mut read_buf) => match read {
                Ok(0) => {
                    tracing::debug!("peer went inactive");
                    pending.drain(|| EndpointError::ConnectionResetByPeer);
                    break;
                }
                Ok(n) => {
                    read_deadline = Instant::now() + config.idle_timeout;
                    cumulation.extend_from_slice(&read_buf[..n]);
                    if let Err(fatal) =
                        drain_frames(decoder.as_mut(), &mut cumulation, &mut pending)
                    {
                        tracing::debug!(%fatal, "closing after pipeline error");
                        pending.fail_oldest(fatal);
                        pending.drain(|| EndpointError::ConnectionResetByPeer);
                        break;
                    }
                }
                Err(error) => {
                    pending.fail_oldest(EndpointError::Io(error));
                    pending.drain(|| EndpointError::ConnectionResetByPeer);
                    break;
                }
            },
            // inbound idle while a response is outstanding
            _ = sleep_until(read_deadline), if !pending.is_empty() => {
                tracing::debug!("read idle timeout");
                pending.fail_oldest(EndpointError::Timeout);
                pending.drain(|| EndpointError::ConnectionResetByPeer);
                break;
            }
        }
    }
}

/// Decode and dispatch every complete frame in the cumulation buffer.
///
/// A frame that is not a decodable response fails only the oldest pending
/// call, which receives a synthetic parse-error response under its own id
/// so the caller can still correlate it; the connection stays up. Framing
/// violations are fatal and propagate.
fn drain_frames(
    decoder: &mut dyn FrameDecoder,
    cumulation: &mut BytesMut,
    pending: &mut PendingCalls,
) -> Result<(), EndpointError> {
    loop {
        match decoder.decode(cumulation)? {
            Some(frame) => match RecordCodec::decode::<Response>(&frame) {
                Ok(response) => pending.complete(response),
                Err(CodecError::BadJson(cause)) => pending.poison_oldest(&cause),
                Err(other) => return Err(other.into()),
            },
            None => return Ok(()),
        }
    }
}

async fn write_request(
    writer: &mut OwnedWriteHalf,
    request: &Request,
    framing: Framing,
) -> Result<(), EndpointError> {
    let payload = RecordCodec::encode(request)?;
    let mut framed = BytesMut::with_capacity(payload.len() + 16);
    framing.encode(&payload, &mut framed);
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// Pending calls: id-keyed for response matching, FIFO for drain order.
struct PendingCalls {
    order: VecDeque<String>,
    by_id: HashMap<String, ReplySlot>,
}

impl PendingCalls {
    fn new() -> Self {
        Self {
            order: VecDeque::new(),
            by_id: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn push(&mut self, id: String, reply: ReplySlot) {
        self.order.push_back(id.clone());
        self.by_id.insert(id, reply);
    }

    /// Complete the call matching the response's wire id.
    fn complete(&mut self, response: Response) {
        match self.by_id.remove(&response.id) {
            Some(reply) => {
                self.order.retain(|id| id != &response.id);
                let _ = reply.send(Ok(response));
            }
            None => {
                tracing::warn!(id = %response.id, "response for unknown call id");
            }
        }
    }

    /// Succeed the oldest call with a synthetic parse-error response.
    fn poison_oldest(&mut self, cause: &serde_json::Error) {
        if let Some((id, reply)) = self.pop_oldest() {
            let synthetic =
                Response::failure(id, ErrorObject::parse_error(cause.to_string()));
            let _ = reply.send(Ok(synthetic));
        }
    }

    /// Fail the oldest call with a transport error.
    fn fail_oldest(&mut self, error: EndpointError) {
        if let Some((_, reply)) = self.pop_oldest() {
            let _ = reply.send(Err(error));
        }
    }

    /// Fail every remaining call oldest-first.
    fn drain(&mut self, error: impl Fn() -> EndpointError) {
        while let Some((_, reply)) = self.pop_oldest() {
            let _ = reply.send(Err(error()));
        }
    }

    fn pop_oldest(&mut self) -> Option<(String, ReplySlot)> {
        while let Some(id) = self.order.pop_front() {
            if let Some(reply) = self.by_id.remove(&id) {
                return Some((id, reply));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcErrorKind;

    fn slot() -> (ReplySlot, oneshot::Receiver<Result<Response, EndpointError>>) {
        oneshot::channel()
    }

    #[test]
    fn test_complete_matches_by_id_not_position() {
        let mut pending = PendingCalls::new();
        let (tx_a, mut rx_a) = slot();
        let (tx_b, mut rx_b) = slot();
        pending.push("a".to_string(), tx_a);
        pending.push("b".to_string(), tx_b);

        // second call answered first
        pending.complete(Response::success("b", serde_json::json!(2)));
        let got = rx_b.try_recv().unwrap().unwrap();
        assert_eq!(got.id, "b");
        assert!(rx_a.try_recv().is_err());

        pending.complete(Response::success("a", serde_json::json!(1)));
        assert_eq!(rx_a.try_recv().unwrap().unwrap().id, "a");
    }

    #[test]
    fn test_poison_oldest_is_correlated_and_succeeds_promise() {
        let mut pending = PendingCalls::new();
        let (tx, mut rx) = slot();
        pending.push("head".to_string(), tx);

        let cause = serde_json::from_str::<Response>("garbage").unwrap_err();
        pending.poison_oldest(&cause);

        let response = rx.try_recv().unwrap().unwrap();
        assert_eq!(response.id, "head");
        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, RpcErrorKind::InvalidServerResponse);
    }

    #[test]
    fn test_drain_fails_remaining_oldest_first() {
        let mut pending = PendingCalls::new();
        let (tx_a, mut rx_a) = slot();
        let (tx_b, mut rx_b) = slot();
        pending.push("a".to_string(), tx_a);
        pending.push("b".to_string(), tx_b);

        pending.drain(|| EndpointError::ConnectionResetByPeer);

        assert!(matches!(
            rx_a.try_recv().unwrap(),
            Err(EndpointError::ConnectionResetByPeer)
        ));
        assert!(matches!(
            rx_b.try_recv().unwrap(),
            Err(EndpointError::ConnectionResetByPeer)
        ));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unknown_response_id_is_ignored() {
        let mut pending = PendingCalls::new();
        let (tx, mut rx) = slot();
        pending.push("a".to_string(), tx);

        pending.complete(Response::success("ghost", serde_json::json!(0)));
        assert!(rx.try_recv().is_err());
        assert!(!pending.is_empty());
    }
}
