//! # Reconciliation
//!
//! Applies one decoded push to an ordered collection. Every rule is
//! idempotent and tolerates reordering, so at-least-once delivery can never
//! break the one-document-per-id invariant:
//!
//! | event  | id present              | id absent                  |
//! |--------|-------------------------|----------------------------|
//! | CREATE | replace unless older    | append                     |
//! | UPDATE | replace whole document  | append (update-before-create) |
//! | DELETE | remove                  | ignore                     |
//!
//! UPDATE and DELETE compare no versions: the last delivered document wins.
//! The server is the only writer and delivers each route in order on one
//! channel. A CREATE is the first version of a document by definition, so a
//! duplicate CREATE whose `updatedAt` is older than the stored copy is stale
//! (it was overtaken by an update) and is discarded.
//! Anomalies are logged and reported in the [`Outcome`], never raised.

use indexmap::IndexMap;

use crate::shared::document::{Document, DocumentId};
use crate::shared::wire::Event;

/// Ordered id → document mapping; insertion order is delivery order
pub type Documents<T> = IndexMap<DocumentId, Document<T>>;

/// What applying an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new document was appended
    Inserted,
    /// An existing document was replaced
    Replaced,
    /// A document was removed
    Removed,
    /// CREATE for an id already present; treated as an update
    DuplicateCreate,
    /// CREATE older than the stored copy; discarded
    StaleCreate,
    /// UPDATE for an unknown id; treated as a create
    UpdateBeforeCreate,
    /// DELETE for an unknown id; nothing changed
    DeleteUnknown,
}

impl Outcome {
    /// Whether the event did not match the collection's state
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCreate | Self::StaleCreate | Self::UpdateBeforeCreate | Self::DeleteUnknown
        )
    }

    /// Whether the collection changed
    pub fn changed(&self) -> bool {
        !matches!(self, Self::DeleteUnknown | Self::StaleCreate)
    }
}

/// Apply `event` to `docs`
pub fn reconcile<T>(docs: &mut Documents<T>, event: Event<T>) -> Outcome {
    let outcome = match event {
        Event::Created(doc) => match docs.get_mut(&doc.id) {
            Some(slot) if slot.updated_at > doc.updated_at => Outcome::StaleCreate,
            Some(slot) => {
                *slot = doc;
                Outcome::DuplicateCreate
            }
            None => {
                docs.insert(doc.id.clone(), doc);
                Outcome::Inserted
            }
        },
        Event::Updated(doc) => match docs.get_mut(&doc.id) {
            Some(slot) => {
                *slot = doc;
                Outcome::Replaced
            }
            None => {
                docs.insert(doc.id.clone(), doc);
                Outcome::UpdateBeforeCreate
            }
        },
        Event::Deleted(id) => match docs.shift_remove(&id) {
            Some(_) => Outcome::Removed,
            None => Outcome::DeleteUnknown,
        },
    };
    if outcome.is_anomaly() {
        tracing::debug!("[Reconcile] Anomaly absorbed: {:?}", outcome);
    }
    outcome
}
