//! SQLite-backed document store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use super::{BoxFuture, DocumentRecord, DocumentStore};
use crate::error::{Result, SyncError};

/// SQLite-backed document store.
///
/// # Thread Safety
///
/// The connection is wrapped in a `Mutex`; queries are short and run inline.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at `path`, creating the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database. Data is lost when the store is dropped.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Store("sqlite connection lock poisoned".to_string()))
    }

    fn first_record(&self) -> Result<Option<DocumentRecord>> {
        let conn = self.connection()?;
        let record = conn
            .query_row(
                "SELECT id, content FROM notes ORDER BY created_at, rowid LIMIT 1",
                [],
                |row| {
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        content: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

impl DocumentStore for SqliteStore {
    fn find_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>> {
        Box::pin(async move { self.first_record() })
    }

    fn insert_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now().timestamp_millis();
            let conn = self.connection()?;
            conn.execute(
                "INSERT INTO notes (id, content, created_at, updated_at) VALUES (?, ?, ?, ?)",
                params![id, content, now, now],
            )?;
            log::debug!("[SqliteStore] Inserted document {}", id);
            Ok(id)
        })
    }

    fn update_document<'a>(&'a self, content: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let now = chrono::Utc::now().timestamp_millis();
            let conn = self.connection()?;
            let changed = conn.execute(
                "UPDATE notes SET content = ?, updated_at = ?
                 WHERE id = (SELECT id FROM notes ORDER BY created_at, rowid LIMIT 1)",
                params![content, now],
            )?;
            if changed == 0 {
                return Err(SyncError::NoDocument);
            }
            Ok(())
        })
    }

    fn get_document(&self) -> BoxFuture<'_, Result<Option<DocumentRecord>>> {
        Box::pin(async move { self.first_record() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_in_memory() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find_document().await.unwrap().is_none());

        let id = store.insert_document(r#"{"ops":[]}"#).await.unwrap();
        store
            .update_document(r#"{"ops":[{"insert":"hi"}]}"#)
            .await
            .unwrap();

        let record = store.get_document().await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.content, r#"{"ops":[{"insert":"hi"}]}"#);
    }

    #[tokio::test]
    async fn test_update_without_record_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.update_document("x").await.unwrap_err();
        assert!(matches!(err, SyncError::NoDocument));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_document("saved").await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let record = store.find_document().await.unwrap().unwrap();
        assert_eq!(record.content, "saved");
    }
}
