//! In-process connections
//!
//! [`memory_pair`] returns a connector and the listener that accepts its
//! connections. The listener side sees raw frames, which makes it the
//! building block for embedded servers and test doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{Connection, Connector, TransportError};
use crate::shared::wire::{ClientFrame, ServerFrame};

/// Server end of one in-process connection
#[derive(Debug)]
pub struct ServerSide {
    pub from_client: mpsc::UnboundedReceiver<ClientFrame>,
    pub to_client: mpsc::UnboundedSender<ServerFrame>,
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accept: mpsc::UnboundedSender<ServerSide>,
    refusing: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// While set, connection attempts fail as if the server were unreachable
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::disconnected("connection refused"));
        }
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let (to_client, incoming) = mpsc::unbounded_channel();
        self.accept
            .send(ServerSide { from_client, to_client })
            .map_err(|_| TransportError::disconnected("listener has gone away"))?;
        Ok(Connection { outgoing, incoming })
    }
}

#[derive(Debug)]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<ServerSide>,
}

impl MemoryListener {
    /// Next connection opened by the connector
    pub async fn accept(&mut self) -> Option<ServerSide> {
        self.accepted.recv().await
    }
}

pub fn memory_pair() -> (MemoryConnector, MemoryListener) {
    let (accept, accepted) = mpsc::unbounded_channel();
    (
        MemoryConnector {
            accept,
            refusing: Arc::new(AtomicBool::new(false)),
        },
        MemoryListener { accepted },
    )
}
