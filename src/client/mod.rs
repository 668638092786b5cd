//! Client endpoint: a TCP connector issuing JSON-RPC calls and awaiting
//! their responses.
//!
//! Every call carries a freshly generated UUID id. Submissions hop onto the
//! connection task, which writes requests in submission order; each call
//! returns a future that resolves when the matching response arrives.
//!
//! # Example
//!
//! ```ignore
//! use framed_jsonrpc::{Client, RpcValue};
//!
//! let client = Client::builder()
//!     .connect("127.0.0.1:9000".parse().unwrap())
//!     .await?;
//!
//! let sum = client
//!     .call("add", RpcValue::List(vec![RpcValue::Integer(1), RpcValue::Integer(2)]))
//!     .await?;
//! assert_eq!(sum, RpcValue::Integer(3));
//!
//! client.disconnect().await?;
//! ```

mod connection;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::codec::Framing;
use crate::error::{CallError, EndpointError, Result};
use crate::protocol::{Request, RpcValue};
use crate::server::DEFAULT_TIMEOUT;

use connection::{Command, ConnectionConfig};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Client lifecycle state, advanced monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initializing,
    Connected,
    Disconnected,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    framing: Framing,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            framing: Framing::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Select the framing variant.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the inbound idle timeout (default 5 s). The timer is armed while
    /// a response is outstanding and resets on every inbound byte.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect to the peer.
    ///
    /// The returned future completes once the TCP connect returns.
    pub async fn connect(self, addr: SocketAddr) -> Result<Client> {
        let state = Arc::new(Mutex::new(State::Initializing));

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(%addr, framing = ?self.framing, "client connected");

        let (commands, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let config = ConnectionConfig {
            framing: self.framing,
            idle_timeout: self.timeout,
        };
        let task = tokio::spawn(connection::run(stream, command_rx, config));

        *state.lock().unwrap() = State::Connected;
        Ok(Client {
            state,
            commands,
            task: Mutex::new(Some(task)),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected JSON-RPC client endpoint.
///
/// `disconnect` must be invoked exactly once before the value is dropped;
/// dropping a client that never reached the disconnected state is a
/// programming error reported at destruction.
pub struct Client {
    state: Arc<Mutex<State>>,
    commands: mpsc::Sender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Create a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Issue one call and await the peer's response.
    ///
    /// Submission never blocks on the network; the returned future resolves
    /// when the response arrives, the call fails, or the connection dies
    /// underneath it.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: RpcValue,
    ) -> std::result::Result<RpcValue, CallError> {
        if *self.state.lock().unwrap() != State::Connected {
            return Err(EndpointError::NotReady.into());
        }

        let id = Uuid::new_v4().to_string();
        let request = Request::new(id, method, params.into());
        let (reply, response) = oneshot::channel();

        self.commands
            .send(Command::Call { request, reply })
            .await
            .map_err(|_| EndpointError::Closed)?;

        let response = response.await.map_err(|_| EndpointError::Closed)??;
        Ok(response.into_result()?)
    }

    /// Disconnect from the peer.
    ///
    /// Completes once the connection task has observed the socket close.
    /// Calls still pending at that point fail with `Closed`.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let state = self.state.lock().unwrap();
            if *state != State::Connected {
                return Err(EndpointError::NotReady);
            }
        }

        // the task may already have exited on a peer reset; that is fine
        let _ = self.commands.send(Command::Disconnect).await;
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        *self.state.lock().unwrap() = State::Disconnected;
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let state = *self.state.lock().unwrap();
        if state != State::Disconnected && !std::thread::panicking() {
            tracing::error!(?state, "client dropped without disconnect()");
            debug_assert!(
                false,
                "Client dropped in state {:?}; call disconnect() exactly once",
                state
            );
        }
    }
}
