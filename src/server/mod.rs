//! Server endpoint: a TCP acceptor dispatching JSON-RPC requests to a
//! user-supplied handler.
//!
//! # Example
//!
//! ```ignore
//! use framed_jsonrpc::{service_fn, ErrorObject, Responder, RpcValue, Server};
//!
//! let server = Server::builder()
//!     .bind(
//!         "127.0.0.1:9000".parse().unwrap(),
//!         service_fn(|method: String, params: RpcValue, responder: Responder| async move {
//!             match method.as_str() {
//!                 "ping" => { let _ = responder.succeed(RpcValue::Null).await; }
//!                 _ => { let _ = responder.fail(ErrorObject::method_not_found(&method)).await; }
//!             }
//!         }),
//!     )
//!     .await?;
//!
//! // ... later, exactly once:
//! server.stop().await?;
//! ```

mod connection;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::codec::Framing;
use crate::error::{EndpointError, Result};
use crate::handler::Handler;

use connection::ConnectionConfig;

/// Default inbound idle timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default accept queue depth.
pub const DEFAULT_BACKLOG: u32 = 256;

/// Server lifecycle state, advanced monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initializing,
    Starting,
    Started,
    Stopping,
    Stopped,
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    framing: Framing,
    timeout: Duration,
    backlog: u32,
}

impl ServerBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            framing: Framing::default(),
            timeout: DEFAULT_TIMEOUT,
            backlog: DEFAULT_BACKLOG,
        }
    }

    /// Select the framing variant.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the inbound idle timeout (default 5 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the accept queue depth (default 256).
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Bind the listener and start accepting connections.
    ///
    /// The returned future completes once the listener socket is bound; it
    /// does not block on any connection activity.
    pub async fn bind<H: Handler>(self, addr: SocketAddr, handler: H) -> Result<Server> {
        let state = Arc::new(Mutex::new(State::Initializing));
        *state.lock().unwrap() = State::Starting;

        let listener = bind_listener(addr, self.backlog).map_err(EndpointError::CantBind)?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, framing = ?self.framing, "server listening");

        let shutdown = Arc::new(Notify::new());
        let config = ConnectionConfig {
            framing: self.framing,
            idle_timeout: self.timeout,
        };
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            config,
            shutdown.clone(),
        ));

        *state.lock().unwrap() = State::Started;
        Ok(Server {
            state,
            local_addr,
            shutdown,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn bind_listener(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    config: ConnectionConfig,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted connection");
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::warn!(%peer, %e, "failed to set TCP_NODELAY");
                    }
                    tokio::spawn(connection::run(stream, handler.clone(), config));
                }
                Err(e) => {
                    tracing::error!(%e, "accept failed");
                }
            },
        }
    }
    tracing::info!("server stopped accepting");
}

/// A running JSON-RPC server endpoint.
///
/// `stop` must be invoked exactly once before the value is dropped;
/// dropping a server that never reached the stopped state is a programming
/// error reported at destruction.
pub struct Server {
    state: Arc<Mutex<State>>,
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Create a server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The bound listener address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and release the listener socket.
    ///
    /// Gated on the started state; completes once the accept loop has
    /// observed the listener close. In-flight handler callbacks are not
    /// awaited.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != State::Started {
                return Err(EndpointError::NotReady);
            }
            *state = State::Stopping;
        }

        // notify_one stores a permit, so the accept loop cannot miss a stop
        // that lands between two of its iterations
        self.shutdown.notify_one();
        let task = self.accept_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        *self.state.lock().unwrap() = State::Stopped;
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let state = *self.state.lock().unwrap();
        if state != State::Stopped && !std::thread::panicking() {
            tracing::error!(?state, "server dropped without stop()");
            debug_assert!(
                false,
                "Server dropped in state {:?}; call stop() exactly once",
                state
            );
        }
    }
}
