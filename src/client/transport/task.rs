//! Transport task: owns the connection, the correlation table and the handler table.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::{mpsc, watch};

use super::{Backoff, Command, Connection, ConnectionStatus, Connector, PushSink, Reply, TransportError};
use crate::shared::wire::{ApiResponse, ClientFrame, Method, PushMessage, ServerFrame};

struct Handler {
    id: u64,
    sink: PushSink,
}

/// Why the online loop ended
enum Exit {
    Disconnected(String),
    Shutdown,
}

struct TransportState {
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    /// In-flight requests by correlation id
    pending: HashMap<String, Reply>,
    /// Push handlers by route, in registration order
    handlers: HashMap<String, Vec<Handler>>,
    next_control_id: u64,
}

pub(super) async fn run<C: Connector>(
    connector: C,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    mut backoff: Backoff,
) {
    let mut state = TransportState {
        commands,
        status,
        pending: HashMap::new(),
        handlers: HashMap::new(),
        next_control_id: 0,
    };

    loop {
        state.status.send_replace(ConnectionStatus::Connecting);
        let Some(result) = state.drive_offline(connector.connect()).await else {
            break;
        };

        match result {
            Ok(connection) => {
                backoff.reset();
                tracing::info!("[Transport] Connection open");
                state.status.send_replace(ConnectionStatus::Open);
                match state.run_online(connection).await {
                    Exit::Shutdown => break,
                    Exit::Disconnected(reason) => {
                        tracing::warn!("[Transport] Connection lost: {}", reason);
                        state.fail_pending(&reason);
                        state.status.send_replace(ConnectionStatus::Closed { reason });
                    }
                }
            }
            Err(e) => {
                tracing::warn!("[Transport] Connect failed (attempt {}): {}", backoff.attempts() + 1, e);
                state.status.send_replace(ConnectionStatus::Closed {
                    reason: e.detail().to_string(),
                });
            }
        }

        let delay = backoff.next_delay();
        tracing::debug!("[Transport] Reconnecting in {:?}", delay);
        if state.drive_offline(tokio::time::sleep(delay)).await.is_none() {
            break;
        }
    }

    state.fail_pending("transport has shut down");
    state.status.send_replace(ConnectionStatus::Stopped);
    tracing::info!("[Transport] Stopped");
}

impl TransportState {
    /// Run `fut` to completion while serving commands without a connection.
    /// Returns `None` when asked to shut down.
    async fn drive_offline<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Some(out),
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => return None,
                    Some(command) => self.handle_offline(command),
                },
            }
        }
    }

    fn handle_offline(&mut self, command: Command) {
        match command {
            Command::Request { frame, reply } => {
                tracing::debug!("[Transport] Rejecting {} {} while disconnected", frame.id, frame.route);
                let _ = reply.send(Err(TransportError::disconnected("not connected")));
            }
            Command::Abandon { id } => {
                self.pending.remove(&id);
            }
            Command::Subscribe { handler, route, sink } => {
                self.add_handler(handler, route, sink);
            }
            Command::Unsubscribe { handler, route } => {
                self.remove_handler(handler, &route);
            }
            Command::Shutdown => {}
        }
    }

    async fn run_online(&mut self, connection: Connection) -> Exit {
        let Connection { outgoing, mut incoming } = connection;

        // The server forgets subscriptions with the connection
        let routes: Vec<String> = self.handlers.keys().cloned().collect();
        for route in routes {
            if let Err(reason) = self.send_control(&outgoing, Method::Sub, &route) {
                return Exit::Disconnected(reason);
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => return Exit::Shutdown,
                    Some(command) => {
                        if let Err(reason) = self.handle_online(command, &outgoing) {
                            return Exit::Disconnected(reason);
                        }
                    }
                },
                frame = incoming.recv() => match frame {
                    Some(frame) => self.dispatch(frame),
                    None => return Exit::Disconnected("connection closed".to_string()),
                },
            }
        }
    }

    fn handle_online(
        &mut self,
        command: Command,
        outgoing: &mpsc::UnboundedSender<ClientFrame>,
    ) -> Result<(), String> {
        match command {
            Command::Request { frame, reply } => {
                let id = frame.id.clone();
                self.pending.insert(id.clone(), reply);
                if outgoing.send(frame).is_err() {
                    if let Some(reply) = self.pending.remove(&id) {
                        let _ = reply.send(Err(TransportError::disconnected("connection closed")));
                    }
                    return Err("connection closed".to_string());
                }
            }
            Command::Abandon { id } => {
                if self.pending.remove(&id).is_some() {
                    tracing::debug!("[Transport] Abandoned request {}", id);
                }
            }
            Command::Subscribe { handler, route, sink } => {
                if self.add_handler(handler, route.clone(), sink) {
                    self.send_control(outgoing, Method::Sub, &route)?;
                }
            }
            Command::Unsubscribe { handler, route } => {
                if self.remove_handler(handler, &route) {
                    self.send_control(outgoing, Method::Unsub, &route)?;
                }
            }
            Command::Shutdown => {}
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: ServerFrame) {
        match frame {
            ServerFrame::Response(response) => self.complete(response),
            ServerFrame::Push { route, event } => self.deliver(&route, event),
        }
    }

    fn complete(&mut self, response: ApiResponse) {
        match self.pending.remove(&response.id) {
            Some(reply) => {
                let _ = reply.send(Ok(response));
            }
            None if response.id.starts_with("ctl-") => {
                if !response.success {
                    tracing::warn!(
                        "[Transport] Subscription request {} rejected: {}",
                        response.id,
                        response.error.as_deref().unwrap_or("no reason given")
                    );
                }
            }
            None => tracing::debug!("[Transport] Reply for unknown or abandoned request {}", response.id),
        }
    }

    fn deliver(&self, route: &str, event: PushMessage) {
        let Some(handlers) = self.handlers.get(route) else {
            tracing::debug!("[Transport] Dropping {:?} push on unregistered route {}", event.kind, route);
            return;
        };
        // A closed sink stays registered until its handle is released
        for handler in handlers.iter() {
            if handler.sink.send(event.clone()).is_err() {
                tracing::debug!("[Transport] Handler {} on {} is no longer receiving", handler.id, route);
            }
        }
    }

    /// Returns true when this is the first handler for the route
    fn add_handler(&mut self, id: u64, route: String, sink: PushSink) -> bool {
        let handlers = self.handlers.entry(route).or_default();
        handlers.push(Handler { id, sink });
        handlers.len() == 1
    }

    /// Returns true when the route has no handlers left
    fn remove_handler(&mut self, id: u64, route: &str) -> bool {
        let Some(handlers) = self.handlers.get_mut(route) else {
            return false;
        };
        handlers.retain(|handler| handler.id != id);
        if handlers.is_empty() {
            self.handlers.remove(route);
            return true;
        }
        false
    }

    fn send_control(
        &mut self,
        outgoing: &mpsc::UnboundedSender<ClientFrame>,
        method: Method,
        route: &str,
    ) -> Result<(), String> {
        self.next_control_id += 1;
        let frame = ClientFrame {
            id: format!("ctl-{}", self.next_control_id),
            route: route.to_string(),
            method,
            body: None,
        };
        tracing::debug!("[Transport] {:?} {}", method, route);
        outgoing.send(frame).map_err(|_| "connection closed".to_string())
    }

    fn fail_pending(&mut self, reason: &str) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(TransportError::disconnected(reason.to_string())));
        }
    }
}
