//! # Subscription Registry
//!
//! Keeps at most one push registration per route for its owner. Registering a
//! route again releases the earlier registration first, so events that arrive
//! afterwards reach only the newest handler.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::client::transport::{PushSink, SubscriptionHandle, Transport};

#[derive(Debug)]
pub struct SubscriptionRegistry {
    transport: Transport,
    active: Mutex<HashMap<String, SubscriptionHandle>>,
}

impl SubscriptionRegistry {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Make `sink` the only handler for `route`, releasing any earlier one
    pub async fn ensure(&self, route: &str, sink: PushSink) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.remove(route) {
            tracing::debug!("[Registry] Replacing handler on {}", route);
            previous.unsubscribe();
        }
        let handle = self.transport.subscribe(route, sink);
        active.insert(route.to_string(), handle);
        tracing::info!("[Registry] Subscribed to {}", route);
    }

    /// Release the handler for `route`. Returns false when there was none.
    pub async fn release(&self, route: &str) -> bool {
        let handle = self.active.lock().await.remove(route);
        match handle {
            Some(handle) => {
                handle.unsubscribe();
                tracing::info!("[Registry] Released {}", route);
                true
            }
            None => false,
        }
    }

    /// Release every handler. Returns how many were active.
    pub async fn release_all(&self) -> usize {
        let handles: Vec<SubscriptionHandle> = self.active.lock().await.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.unsubscribe();
            tracing::info!("[Registry] Released {}", handle.route());
        }
        handles.len()
    }

    pub async fn is_active(&self, route: &str) -> bool {
        self.active.lock().await.contains_key(route)
    }

    /// Routes with an active handler, sorted
    pub async fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.active.lock().await.keys().cloned().collect();
        routes.sort();
        routes
    }
}
