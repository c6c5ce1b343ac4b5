//! Document store abstraction.
//!
//! The store holds a single document record whose content is an opaque
//! serialized snapshot. It is only ever touched by bootstrap (find, insert,
//! get) and periodic persistence (update).
//!
//! ## Object safety
//!
//! [`DocumentStore`] returns boxed futures so sessions can hold it as
//! `Arc<dyn DocumentStore>` and swap the backend at startup.

mod memory_store;
#[cfg(feature = "sqlite")]
mod sqlite_store;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::Result;

pub use memory_store::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteStore;

/// A boxed future for object-safe async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DocumentRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Serialized snapshot, stored verbatim.
    pub content: String,
}

/// Backing store for the document.
pub trait DocumentStore: Send + Sync {
    /// Look up the document record, if one exists.
    fn find_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>>;

    /// Create a record holding `content`. Returns the new record's id.
    fn insert_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Replace the content of the document record.
    ///
    /// Fails with [`SyncError::NoDocument`](crate::error::SyncError::NoDocument)
    /// when there is no record to update.
    fn update_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Fetch the document record for loading.
    fn get_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>>;
}
