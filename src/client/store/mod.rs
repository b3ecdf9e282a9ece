//! # Collection Store
//!
//! In-memory copy of one document kind, kept current by reconciling pushes.
//!
//! ## Update strategy
//!
//! Mutations never touch the local collection. `create`, `update` and
//! `delete` send a request and return; the visible change arrives with the
//! server's push echo and goes through the same reconciliation path as every
//! other client's edits. A failed request therefore leaves the collection
//! exactly as it was.
//!
//! ## Scopes and epochs
//!
//! Every time the store starts tracking a new scope (a board, a room, or
//! nothing) the collection is cleared and its epoch advances. Snapshot
//! responses and pushes carry the epoch they were requested under and are
//! discarded if it is no longer current, so a late answer for an abandoned
//! scope cannot repopulate the collection.
//!
//! ## Refreshing
//!
//! `load_snapshot` on a store that is already streaming the same scope
//! keeps the epoch. The subscription is renewed before the fetch, pushes
//! that arrive on it wait until the new snapshot is installed, and the
//! stream carries on from there.
//!
//! The app store is driven by the board session. Its scope changes only
//! through the session; asking the store itself for another scope fails
//! with [`StoreError::SessionManaged`].
//!
//! ## Observing
//!
//! The collection lives in a `tokio::sync::watch` channel: readers call
//! [`CollectionStore::watch`] and select what they need from the current
//! value, and are woken on every change.

mod apps;
mod rooms;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::client::reconciliation::{reconcile, Documents, Outcome};
use crate::client::registry::SubscriptionRegistry;
use crate::client::transport::{Transport, TransportError};
use crate::shared::document::Document;
use crate::shared::entity::{decode_document, Entity, EntityKind, Filter};
use crate::shared::error::SharedError;
use crate::shared::schema::{App, Board, Room, User};
use crate::shared::wire::{Event, Method, PushKind, PushMessage};

pub type AppStore = CollectionStore<App>;
pub type BoardStore = CollectionStore<Board>;
pub type RoomStore = CollectionStore<Room>;
pub type UserStore = CollectionStore<User>;

/// Generation counter for the store's scope
pub type Epoch = u64;

/// Errors surfaced to callers of store operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid document: {0}")]
    Invalid(#[from] SharedError),

    #[error("the {0} store follows the board session")]
    SessionManaged(EntityKind),
}

/// Result of installing a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot replaced the collection
    Installed { count: usize },
    /// The store moved to another scope while the fetch was in flight
    Superseded,
}

/// Current contents of a store
#[derive(Debug, Clone)]
pub struct Collection<T> {
    scope: Option<String>,
    epoch: Epoch,
    docs: Documents<T>,
    anomalies: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            scope: None,
            epoch: 0,
            docs: Documents::new(),
            anomalies: 0,
        }
    }
}

impl<T> Collection<T> {
    /// Scope key of the filter the collection was loaded with
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document<T>> {
        self.docs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    /// Documents in delivery order
    pub fn iter(&self) -> impl Iterator<Item = &Document<T>> {
        self.docs.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.docs.keys().map(String::as_str).collect()
    }

    /// Reconciliation anomalies absorbed since the store was created
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }
}

impl<T: Clone> Collection<T> {
    pub fn to_vec(&self) -> Vec<Document<T>> {
        self.docs.values().cloned().collect()
    }
}

struct StoreInner<T: Entity> {
    transport: Transport,
    registry: SubscriptionRegistry,
    state: watch::Sender<Collection<T>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    /// Serializes scope transitions
    transition: Mutex<()>,
    /// Set when a board session owns the scope
    managed: AtomicBool,
}

/// Store for one document kind. Clones share the same collection.
pub struct CollectionStore<T: Entity> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Entity> Clone for CollectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> std::fmt::Debug for CollectionStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CollectionStore")
            .field("kind", &T::KIND)
            .field("scope", &state.scope)
            .field("epoch", &state.epoch)
            .field("len", &state.docs.len())
            .finish()
    }
}

impl<T: Entity> CollectionStore<T> {
    /// Create an empty store bound to `transport`
    pub fn new(transport: Transport) -> Self {
        let (state, _) = watch::channel(Collection::default());
        Self {
            inner: Arc::new(StoreInner {
                registry: SubscriptionRegistry::new(transport.clone()),
                transport,
                state,
                pump: Mutex::new(None),
                transition: Mutex::new(()),
                managed: AtomicBool::new(false),
            }),
        }
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    /// Observe the collection
    pub fn watch(&self) -> watch::Receiver<Collection<T>> {
        self.inner.state.subscribe()
    }

    /// Copy of the documents in delivery order
    pub fn documents(&self) -> Vec<Document<T>> {
        self.inner.state.borrow().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<Document<T>> {
        self.inner.state.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().is_empty()
    }

    pub fn epoch(&self) -> Epoch {
        self.inner.state.borrow().epoch
    }

    pub fn scope(&self) -> Option<String> {
        self.inner.state.borrow().scope.clone()
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Ask the server to create a document. The store changes when the
    /// CREATE push arrives, not before.
    pub async fn create(&self, payload: &T) -> Result<(), StoreError> {
        payload.validate()?;
        let body = serde_json::to_value(payload).map_err(SharedError::from)?;
        self.inner.transport.request(T::ROUTE, Method::Post, Some(body)).await?;
        tracing::info!("[Store] Requested create in {}", T::KIND);
        Ok(())
    }

    /// Ask the server to merge `partial` into document `id`
    pub async fn update(&self, id: &str, partial: Value) -> Result<(), StoreError> {
        if !partial.is_object() {
            return Err(SharedError::validation("update", "partial update must be an object").into());
        }
        let route = format!("{}/{}", T::ROUTE, id);
        self.inner.transport.request(&route, Method::Put, Some(partial)).await?;
        tracing::debug!("[Store] Requested update of {} {}", T::KIND, id);
        Ok(())
    }

    /// Ask the server to delete document `id`
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let route = format!("{}/{}", T::ROUTE, id);
        self.inner.transport.request(&route, Method::Delete, None).await?;
        tracing::debug!("[Store] Requested delete of {} {}", T::KIND, id);
        Ok(())
    }

    /// Bulk fetch without touching the collection. Documents that fail to
    /// decode are skipped.
    pub async fn fetch(&self, filter: &Filter) -> Result<Vec<Document<T>>, StoreError> {
        let params = if filter.is_empty() {
            None
        } else {
            Some(serde_json::to_value(filter).map_err(SharedError::from)?)
        };
        let data = self.inner.transport.request(T::ROUTE, Method::Get, params).await?;
        let items = match data {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SharedError::serialization(format!(
                    "expected an array of {} documents, got {}",
                    T::KIND,
                    other
                ))
                .into())
            }
        };
        let docs = items
            .into_iter()
            .filter_map(|item| match decode_document::<T>(item) {
                Ok(doc) => {
                    note_unchecked(&doc);
                    Some(doc)
                }
                Err(e) => {
                    tracing::warn!("[Store] Skipping undecodable {} document: {}", T::KIND, e);
                    None
                }
            })
            .collect();
        Ok(docs)
    }

    /// Clear the collection, fetch the documents matching `filter`, and
    /// install them unless the store moved to another scope meanwhile.
    ///
    /// A store already streaming `filter`'s scope is refreshed in place and
    /// keeps streaming. Otherwise any subscription is released and the
    /// collection holds a plain copy.
    pub async fn load_snapshot(&self, filter: &Filter) -> Result<SnapshotOutcome, StoreError> {
        let scope = filter.scope_key();
        let transition = self.inner.transition.lock().await;
        if self.is_streaming().await && self.scope() == scope {
            return self.refresh(filter, transition).await;
        }
        self.check_unmanaged()?;
        self.detach().await;
        let epoch = self.begin_scope(scope);
        drop(transition);

        let docs = self.fetch(filter).await?;
        Ok(self.install(epoch, docs))
    }

    /// Reload the streamed scope without a new epoch
    async fn refresh(&self, filter: &Filter, transition: MutexGuard<'_, ()>) -> Result<SnapshotOutcome, StoreError> {
        let epoch = self.epoch();
        let pushes = self.attach(&T::subscription_route(filter)).await;
        drop(transition);

        let fetched = self.fetch(filter).await;

        let _transition = self.inner.transition.lock().await;
        if self.epoch() != epoch {
            tracing::info!("[Store] {} refresh superseded", T::KIND);
            return Ok(SnapshotOutcome::Superseded);
        }
        let previous = self.inner.pump.lock().await.take();
        match fetched {
            Ok(docs) => {
                // pushes still queued on the old subscription predate the snapshot
                if let Some(previous) = previous {
                    previous.abort();
                    let _ = previous.await;
                }
                let outcome = self.install(epoch, docs);
                if let SnapshotOutcome::Installed { count } = outcome {
                    self.start_pump(epoch, pushes).await;
                    tracing::info!("[Store] Refreshed {} ({} documents)", T::KIND, count);
                }
                Ok(outcome)
            }
            Err(e) => {
                // the old subscription is released, so its pump ends once drained
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                self.start_pump(epoch, pushes).await;
                tracing::warn!("[Store] Refresh of {} failed, keeping current copy: {}", T::KIND, e);
                Err(e)
            }
        }
    }

    /// Track `filter` live: snapshot plus subscription.
    ///
    /// The subscription is registered before the snapshot request, pushes
    /// received meanwhile are buffered and applied after the snapshot is
    /// installed, in delivery order.
    pub async fn follow(&self, filter: &Filter) -> Result<SnapshotOutcome, StoreError> {
        let route = T::subscription_route(filter);
        let (epoch, pushes) = {
            let _transition = self.inner.transition.lock().await;
            self.check_unmanaged()?;
            self.detach().await;
            let epoch = self.begin_scope(filter.scope_key());
            let pushes = self.attach(&route).await;
            (epoch, pushes)
        };

        let docs = match self.fetch(filter).await {
            Ok(docs) => docs,
            Err(e) => {
                let _transition = self.inner.transition.lock().await;
                if self.epoch() == epoch {
                    self.detach().await;
                }
                return Err(e);
            }
        };

        let _transition = self.inner.transition.lock().await;
        let outcome = self.install(epoch, docs);
        if let SnapshotOutcome::Installed { count } = outcome {
            self.start_pump(epoch, pushes).await;
            tracing::info!("[Store] Following {} on {} ({} documents)", T::KIND, route, count);
        }
        Ok(outcome)
    }

    /// Stop following: release subscriptions and empty the collection
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _transition = self.inner.transition.lock().await;
        self.check_unmanaged()?;
        self.detach().await;
        self.begin_scope(None);
        Ok(())
    }

    /// Apply one change. This is the only path that mutates the collection
    /// after a snapshot; it is driven by incoming pushes.
    pub fn apply_event(&self, kind: PushKind, document: Document<T>) -> Outcome {
        self.apply(Event::new(kind, document))
    }

    /// Apply a decoded change regardless of scope
    pub fn apply(&self, event: Event<T>) -> Outcome {
        let mut outcome = Outcome::DeleteUnknown;
        self.inner.state.send_if_modified(|collection| {
            outcome = collection.reconcile(event);
            outcome.changed()
        });
        outcome
    }

    /// Hand scope changes over to a board session
    pub(crate) fn mark_managed(&self) {
        self.inner.managed.store(true, Ordering::Release);
    }

    fn check_unmanaged(&self) -> Result<(), StoreError> {
        if self.inner.managed.load(Ordering::Acquire) {
            return Err(StoreError::SessionManaged(T::KIND));
        }
        Ok(())
    }

    /// Hold off other scope transitions on this store
    pub(crate) async fn lock_scope(&self) -> MutexGuard<'_, ()> {
        self.inner.transition.lock().await
    }

    async fn is_streaming(&self) -> bool {
        self.inner.pump.lock().await.is_some()
    }

    /// Empty the collection and start a new epoch for `scope`
    pub(crate) fn begin_scope(&self, scope: Option<String>) -> Epoch {
        let mut epoch = 0;
        self.inner.state.send_modify(|collection| {
            collection.epoch += 1;
            collection.scope = scope;
            collection.docs.clear();
            epoch = collection.epoch;
        });
        tracing::debug!("[Store] {} entered epoch {}", T::KIND, epoch);
        epoch
    }

    /// Replace the collection with `docs` if `epoch` is still current
    pub(crate) fn install(&self, epoch: Epoch, docs: Vec<Document<T>>) -> SnapshotOutcome {
        let mut outcome = SnapshotOutcome::Superseded;
        self.inner.state.send_if_modified(|collection| {
            if collection.epoch != epoch {
                return false;
            }
            collection.docs = docs.into_iter().map(|doc| (doc.id.clone(), doc)).collect();
            outcome = SnapshotOutcome::Installed {
                count: collection.docs.len(),
            };
            true
        });
        if outcome == SnapshotOutcome::Superseded {
            tracing::info!("[Store] Discarded {} snapshot for abandoned epoch {}", T::KIND, epoch);
        }
        outcome
    }

    /// Register for pushes on `route`; they queue in the returned receiver
    pub(crate) async fn attach(&self, route: &str) -> mpsc::UnboundedReceiver<PushMessage> {
        let (sink, pushes) = mpsc::unbounded_channel();
        self.inner.registry.ensure(route, sink).await;
        pushes
    }

    /// Apply queued and future pushes from `pushes` under `epoch`
    pub(crate) async fn start_pump(&self, epoch: Epoch, mut pushes: mpsc::UnboundedReceiver<PushMessage>) {
        let store: Weak<StoreInner<T>> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(push) = pushes.recv().await {
                let Some(inner) = store.upgrade() else {
                    break;
                };
                inner.handle_push(epoch, &push);
            }
        });
        if let Some(previous) = self.inner.pump.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Stop applying pushes and release every subscription of this store
    pub(crate) async fn detach(&self) {
        if let Some(pump) = self.inner.pump.lock().await.take() {
            pump.abort();
        }
        self.inner.registry.release_all().await;
    }
}

impl<T: Entity> StoreInner<T> {
    fn handle_push(&self, epoch: Epoch, push: &PushMessage) {
        if !push.is_for(T::KIND) {
            tracing::trace!("[Store] {} store ignoring {} push", T::KIND, push.col);
            return;
        }
        let event = match push.decode::<T>() {
            Ok(event) => {
                if let Event::Created(doc) | Event::Updated(doc) = &event {
                    note_unchecked(doc);
                }
                event
            }
            Err(e) => {
                tracing::warn!("[Store] Dropping undecodable {} push: {}", T::KIND, e);
                return;
            }
        };
        let id = event.id().to_string();
        let mut outcome = None;
        self.state.send_if_modified(|collection| {
            if collection.epoch != epoch {
                return false;
            }
            let applied = collection.reconcile(event);
            outcome = Some(applied);
            applied.changed()
        });
        match outcome {
            Some(outcome) => tracing::debug!("[Store] {} {} {:?}", T::KIND, id, outcome),
            None => tracing::debug!("[Store] Dropped {} push for {} from abandoned epoch {}", T::KIND, id, epoch),
        }
    }
}

impl<T> Collection<T> {
    fn reconcile(&mut self, event: Event<T>) -> Outcome {
        let outcome = reconcile(&mut self.docs, event);
        if outcome.is_anomaly() {
            self.anomalies += 1;
        }
        outcome
    }
}

/// Server copies are kept even when they fail the checks applied to creates
fn note_unchecked<T: Entity>(doc: &Document<T>) {
    if let Err(e) = doc.data.validate() {
        tracing::debug!("[Store] Keeping {} {} that fails local checks: {}", T::KIND, doc.id, e);
    }
}
