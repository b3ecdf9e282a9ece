//! Connections
//!
//! A [`Connector`] opens one physical connection and hands it to the transport
//! as a pair of frame channels. The transport never sees sockets; a closed
//! `incoming` channel is how it learns the connection is gone.

use std::future::Future;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::client::transport::error::TransportError;
use crate::shared::wire::{ClientFrame, ServerFrame};

/// An open connection, expressed as frame channels
#[derive(Debug)]
pub struct Connection {
    /// Frames to write to the server
    pub outgoing: mpsc::UnboundedSender<ClientFrame>,
    /// Frames read from the server; closes when the connection drops
    pub incoming: mpsc::UnboundedReceiver<ServerFrame>,
}

/// Opens connections to the server. Called again after every disconnect.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// Newline-delimited JSON frames over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            TransportError::disconnected(format!("connect to {} failed: {}", self.addr, e))
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("[Transport] Could not set TCP_NODELAY: {}", e);
        }
        let (read_half, mut write_half) = stream.into_split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel::<ServerFrame>();

        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                let mut line = match serde_json::to_vec(&frame) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("[Transport] Failed to encode frame {}: {}", frame.id, e);
                        continue;
                    }
                };
                line.push(b'\n');
                if let Err(e) = write_half.write_all(&line).await {
                    tracing::warn!("[Transport] Write failed: {}", e);
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<ServerFrame>(&line) {
                            Ok(frame) => {
                                if incoming_tx.send(frame).is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("[Transport] Dropping malformed frame: {}", e),
                        }
                    }
                    Ok(None) => {
                        tracing::info!("[Transport] Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("[Transport] Read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Connection { outgoing, incoming })
    }
}
