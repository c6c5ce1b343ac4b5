//! In-memory document store.
//!
//! Used by tests and as the relay's fallback when no database can be opened.
//! Supports injecting write failures so retry behavior can be exercised.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BoxFuture, DocumentRecord, DocumentStore};
use crate::error::{Result, SyncError};

/// In-memory document store.
///
/// Records are kept in insertion order; lookups and updates target the first
/// one, so duplicate records created by racing bootstraps are tolerated.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<DocumentRecord>>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    failing_writes: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a record with `content`.
    pub fn with_document(content: &str) -> Self {
        let store = Self::new();
        store.records.write().unwrap().push(DocumentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
        });
        store
    }

    /// Make the next `count` writes (inserts and updates) fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Content of the first record, if any.
    pub fn content(&self) -> Option<String> {
        self.records
            .read()
            .unwrap()
            .first()
            .map(|record| record.content.clone())
    }

    /// Number of records held.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Number of insert calls that reached the store, failed ones included.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of update calls that reached the store, failed ones included.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> Result<()> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(SyncError::Store("injected write failure".to_string())),
            Err(_) => Ok(()),
        }
    }

    fn first_record(&self) -> Option<DocumentRecord> {
        self.records.read().unwrap().first().cloned()
    }
}

impl DocumentStore for MemoryStore {
    fn find_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>> {
        Box::pin(async move { Ok(self.first_record()) })
    }

    fn insert_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.take_injected_failure()?;

            let id = uuid::Uuid::new_v4().to_string();
            self.records.write().unwrap().push(DocumentRecord {
                id: id.clone(),
                content: content.to_string(),
            });
            log::debug!("[MemoryStore] Inserted document {}", id);
            Ok(id)
        })
    }

    fn update_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.take_injected_failure()?;

            let mut records = self.records.write().unwrap();
            let record = records.first_mut().ok_or(SyncError::NoDocument)?;
            record.content = content.to_string();
            Ok(())
        })
    }

    fn get_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>> {
        Box::pin(async move { Ok(self.first_record()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = MemoryStore::new();
        assert!(store.find_document().await.unwrap().is_none());

        let id = store.insert_document(r#"{"ops":[]}"#).await.unwrap();
        let record = store.get_document().await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.content, r#"{"ops":[]}"#);
        assert_eq!(store.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_update_without_record_fails() {
        let store = MemoryStore::new();
        let err = store.update_document("x").await.unwrap_err();
        assert!(matches!(err, SyncError::NoDocument));
    }

    #[tokio::test]
    async fn test_update_targets_first_record() {
        let store = MemoryStore::with_document("first");
        store.insert_document("second").await.unwrap();

        store.update_document("updated").await.unwrap();
        assert_eq!(store.content().as_deref(), Some("updated"));
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::with_document("v0");
        store.fail_next_writes(2);

        assert!(store.update_document("v1").await.is_err());
        assert!(store.update_document("v1").await.is_err());
        store.update_document("v1").await.unwrap();

        assert_eq!(store.update_count(), 3);
        assert_eq!(store.content().as_deref(), Some("v1"));
    }
}
