//! # Transport Channel
//!
//! One logical connection to the server carrying request/response calls
//! (matched by correlation id) and pushes on subscribed routes.
//!
//! ## Architecture
//!
//! A single background task owns the connection, the correlation table and
//! the handler table. [`Transport`] handles talk to it over a command channel;
//! push handlers are channel senders, so delivery is message passing and every
//! route keeps FIFO order.
//!
//! - **Requests** fail with `disconnected` while the channel is down and when
//!   it drops with the request in flight, and with `timeout` when no reply
//!   arrives in time.
//! - **Subscriptions** survive disconnects. After every reconnect the task
//!   re-sends `SUB` for each route that still has a handler, because the
//!   server forgets subscriptions with the connection.
//! - **Pushes** for a route with no handler are dropped.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boardsync::client::transport::{TcpConnector, Transport};
//! use boardsync::shared::{AppConfig, Method};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let transport = Transport::spawn(TcpConnector::new(&config.socket_addr), &config);
//! let rooms = transport.request("/api/rooms", Method::Get, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod connection;
pub mod error;
pub mod memory;
mod task;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use crate::shared::config::AppConfig;
use crate::shared::wire::{ApiResponse, ClientFrame, Method, PushMessage};

pub use backoff::Backoff;
pub use connection::{Connection, Connector, TcpConnector};
pub use error::TransportError;
pub use memory::{memory_pair, MemoryConnector, MemoryListener, ServerSide};

/// Receives pushes for one subscription
pub type PushSink = mpsc::UnboundedSender<PushMessage>;

/// Connection lifecycle as seen by the transport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Attempting to open a connection
    Connecting,
    /// Connected; requests are being sent
    Open,
    /// Not connected. `reason` says why; a reconnect is pending unless stopped.
    Closed { reason: String },
    /// The transport task has exited
    Stopped,
}

pub(crate) type Reply = oneshot::Sender<Result<ApiResponse, TransportError>>;

pub(crate) enum Command {
    Request { frame: ClientFrame, reply: Reply },
    Abandon { id: String },
    Subscribe { handler: u64, route: String, sink: PushSink },
    Unsubscribe { handler: u64, route: String },
    Shutdown,
}

/// Handle to the transport task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Transport {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    next_id: Arc<AtomicU64>,
    request_timeout: Duration,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { frame, .. } => write!(f, "Request({} {:?} {})", frame.id, frame.method, frame.route),
            Self::Abandon { id } => write!(f, "Abandon({})", id),
            Self::Subscribe { handler, route, .. } => write!(f, "Subscribe({} {})", handler, route),
            Self::Unsubscribe { handler, route } => write!(f, "Unsubscribe({} {})", handler, route),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl Transport {
    /// Start the transport task on the current tokio runtime
    pub fn spawn<C: Connector>(connector: C, config: &AppConfig) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::Connecting);
        let backoff = Backoff::new(config.reconnect_initial, config.reconnect_max);

        tokio::spawn(task::run(connector, commands_rx, status_tx, backoff));

        Self {
            commands,
            status,
            next_id: Arc::new(AtomicU64::new(1)),
            request_timeout: config.request_timeout,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a request and wait for the server's reply.
    ///
    /// A reply with `success: false` is returned as-is; use
    /// [`Transport::request`] to have it turned into an error.
    pub async fn send_request(
        &self,
        route: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<ApiResponse, TransportError> {
        let id = self.next_id().to_string();
        let frame = ClientFrame {
            id: id.clone(),
            route: route.to_string(),
            method,
            body,
        };
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Request { frame, reply })
            .map_err(|_| TransportError::disconnected("transport has shut down"))?;

        match tokio::time::timeout(self.request_timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::disconnected("transport has shut down")),
            Err(_) => {
                let _ = self.commands.send(Command::Abandon { id });
                Err(TransportError::timeout(format!(
                    "{:?} {} got no reply within {:?}",
                    method, route, self.request_timeout
                )))
            }
        }
    }

    /// Send a request; a `success: false` reply becomes [`TransportError::ServerError`]
    pub async fn request(
        &self,
        route: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Option<Value>, TransportError> {
        let response = self.send_request(route, method, body).await?;
        if response.success {
            Ok(response.data)
        } else {
            Err(TransportError::server(
                response.error.unwrap_or_else(|| format!("{:?} {} failed", method, route)),
            ))
        }
    }

    /// Register `sink` for pushes on `route`.
    ///
    /// The returned handle releases the registration when unsubscribed or
    /// dropped.
    pub fn subscribe(&self, route: &str, sink: PushSink) -> SubscriptionHandle {
        let handler = self.next_id();
        let route = route.to_string();
        if self
            .commands
            .send(Command::Subscribe {
                handler,
                route: route.clone(),
                sink,
            })
            .is_err()
        {
            tracing::warn!("[Transport] Subscribe to {} after shutdown", route);
        }
        SubscriptionHandle {
            handler,
            route,
            commands: self.commands.clone(),
            released: AtomicBool::new(false),
        }
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Watch connection lifecycle changes
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Wait until the connection is open
    pub async fn wait_open(&self) -> Result<(), TransportError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| matches!(s, ConnectionStatus::Open | ConnectionStatus::Stopped))
            .await
            .map_err(|_| TransportError::disconnected("transport has shut down"))
            .and_then(|s| match *s {
                ConnectionStatus::Open => Ok(()),
                _ => Err(TransportError::disconnected("transport has shut down")),
            })
    }

    /// Stop the transport task. Outstanding requests fail with `disconnected`.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Capability to release one push registration. Releasing twice is a no-op.
#[derive(Debug)]
pub struct SubscriptionHandle {
    handler: u64,
    route: String,
    commands: mpsc::UnboundedSender<Command>,
    released: AtomicBool,
}

impl SubscriptionHandle {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Stop receiving pushes for this registration
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.commands.send(Command::Unsubscribe {
            handler: self.handler,
            route: self.route.clone(),
        });
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
