//! Editing surface abstraction.
//!
//! The surface renders the document and reports every mutation as an
//! `(operation, origin)` pair. The origin is what keeps local capture and
//! remote application from feeding each other: only [`ChangeOrigin::User`]
//! changes are ever sent back out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::delta::{Delta, Op};
use crate::delta::AttributeMap;
use crate::error::{Result, SyncError};

/// Who caused a surface mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Typed by the local user. The only origin that is captured and transmitted.
    User,
    /// Applied from an operation received on the message channel.
    Remote,
    /// Programmatic mutation (initial load, tooling).
    Api,
}

impl std::fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOrigin::User => write!(f, "user"),
            ChangeOrigin::Remote => write!(f, "remote"),
            ChangeOrigin::Api => write!(f, "api"),
        }
    }
}

/// Full document state at a point in time, used for persistence only.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    content: Delta,
}

impl DocumentSnapshot {
    /// Wrap document content.
    pub fn new(content: Delta) -> Self {
        Self { content }
    }

    /// Parse a snapshot from stored JSON content.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(Self {
            content: serde_json::from_str(content)?,
        })
    }

    /// The document content.
    pub fn content(&self) -> &Delta {
        &self.content
    }

    /// Take the document content.
    pub fn into_content(self) -> Delta {
        self.content
    }

    /// Canonical JSON form. Two snapshots are "the same" for dedup purposes
    /// exactly when these strings are equal.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.content)?)
    }
}

/// Callback invoked after every surface mutation.
pub type ChangeListener = Arc<dyn Fn(&Delta, ChangeOrigin) + Send + Sync>;

/// The text-editing surface the sync core drives.
pub trait EditingSurface: Send + Sync {
    /// Current full document, or `None` if the surface is not ready.
    fn snapshot(&self) -> Option<DocumentSnapshot>;

    /// Apply an operation on behalf of `origin`.
    ///
    /// Must leave the document untouched if the operation does not fit it.
    fn apply_operation(&self, change: &Delta, origin: ChangeOrigin) -> Result<()>;

    /// Replace the whole document with `snapshot`.
    fn load_snapshot(&self, snapshot: &DocumentSnapshot, origin: ChangeOrigin) -> Result<()>;

    /// Register a listener for `(operation, origin)` change notifications.
    fn subscribe(&self, listener: ChangeListener);
}

/// In-memory rich-text surface.
///
/// Holds the document as a [`Delta`] and notifies listeners after each
/// mutation, outside of its own lock so listeners may read it back.
#[derive(Default)]
pub struct TextSurface {
    document: RwLock<Delta>,
    listeners: RwLock<Vec<ChangeListener>>,
    read_only: AtomicBool,
}

impl TextSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface holding `text`, without notifying anyone.
    pub fn with_text(text: &str) -> Self {
        let surface = Self::new();
        *surface.document.write().unwrap() = Delta::new().insert(text, None);
        surface
    }

    /// Current document content.
    pub fn document(&self) -> Delta {
        self.document.read().unwrap().clone()
    }

    /// Current document as plain text.
    pub fn text(&self) -> String {
        self.document.read().unwrap().to_plain_text()
    }

    /// Document length in positions.
    pub fn len(&self) -> usize {
        self.document.read().unwrap().length()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggle read-only mode. Read-only rejects user edits only.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Whether user edits are currently rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    /// User types `text` at `index`.
    pub fn insert_text(
        &self,
        index: usize,
        text: &str,
        attributes: Option<AttributeMap>,
    ) -> Result<Delta> {
        let change = Delta::new().retain(index, None).insert(text, attributes);
        self.user_edit(|_| change)
    }

    /// User appends `text` at the end of the document.
    ///
    /// The end is read under the same lock the edit is applied with, so a
    /// concurrent remote edit cannot move it in between.
    pub fn append_text(&self, text: &str) -> Result<Delta> {
        self.user_edit(|document| Delta::new().retain(document.length(), None).insert(text, None))
    }

    /// User deletes `length` characters starting at `index`.
    pub fn delete_text(&self, index: usize, length: usize) -> Result<Delta> {
        let change = Delta::new().retain(index, None).delete(length);
        self.user_edit(|_| change)
    }

    /// User applies formatting to a range.
    pub fn format_text(
        &self,
        index: usize,
        length: usize,
        attributes: AttributeMap,
    ) -> Result<Delta> {
        let change = Delta::new()
            .retain(index, None)
            .retain(length, Some(attributes))
            .chop();
        self.user_edit(|_| change)
    }

    fn user_edit(&self, build: impl FnOnce(&Delta) -> Delta) -> Result<Delta> {
        if self.is_read_only() {
            return Err(SyncError::ReadOnly);
        }
        self.mutate_with(build, ChangeOrigin::User)
    }

    fn mutate(&self, change: &Delta, origin: ChangeOrigin) -> Result<()> {
        self.mutate_with(|_| change.clone(), origin).map(|_| ())
    }

    /// Build the change from the current document and apply it under one write lock.
    fn mutate_with(
        &self,
        build: impl FnOnce(&Delta) -> Delta,
        origin: ChangeOrigin,
    ) -> Result<Delta> {
        let change = {
            let mut document = self.document.write().unwrap();
            let change = build(&*document);
            if change.is_empty() {
                return Ok(change);
            }
            let updated = document.apply(&change)?;
            *document = updated;
            change
        };
        self.notify(&change, origin);
        Ok(change)
    }

    fn notify(&self, change: &Delta, origin: ChangeOrigin) {
        let listeners: Vec<ChangeListener> = self.listeners.read().unwrap().clone();
        for listener in listeners {
            listener(change, origin);
        }
    }
}

impl EditingSurface for TextSurface {
    fn snapshot(&self) -> Option<DocumentSnapshot> {
        Some(DocumentSnapshot::new(self.document()))
    }

    fn apply_operation(&self, change: &Delta, origin: ChangeOrigin) -> Result<()> {
        if origin == ChangeOrigin::User && self.is_read_only() {
            return Err(SyncError::ReadOnly);
        }
        self.mutate(change, origin)
    }

    fn load_snapshot(&self, snapshot: &DocumentSnapshot, origin: ChangeOrigin) -> Result<()> {
        let incoming = snapshot.content();
        if !incoming.is_document() {
            return Err(crate::delta::DeltaError::OutOfBounds {
                length: incoming.length(),
            }
            .into());
        }

        let change = {
            let mut document = self.document.write().unwrap();
            let mut change = incoming.clone();
            change.push(Op::Delete {
                delete: document.length(),
            });
            *document = incoming.clone();
            change
        };
        self.notify(&change, origin);
        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) {
        self.listeners.write().unwrap().push(listener);
    }
}
