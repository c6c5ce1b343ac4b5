use std::sync::{Arc, Mutex};

use super::persistence::PersistenceManager;
use super::types::SessionState;
use crate::delta::Delta;
use crate::error::{Result, SyncError};
use crate::store::DocumentStore;
use crate::surface::{ChangeOrigin, DocumentSnapshot, EditingSurface};

/// One-time session startup: make sure a document record exists, then load
/// its content into the surface.
///
/// Runs only from `Uninitialized`. A failed step is logged and leaves the
/// session in `Bootstrapping`; later calls are no-ops.
pub struct BootstrapSequencer {
    store: Arc<dyn DocumentStore>,
    surface: Arc<dyn EditingSurface>,
    persistence: Arc<PersistenceManager>,
    state: Mutex<SessionState>,
}

impl BootstrapSequencer {
    /// Create a sequencer in the `Uninitialized` state.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        surface: Arc<dyn EditingSurface>,
        persistence: Arc<PersistenceManager>,
    ) -> Self {
        Self {
            store,
            surface,
            persistence,
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    /// Current bootstrap state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Run the startup sequence. Returns the resulting state.
    pub async fn bootstrap(&self) -> SessionState {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Uninitialized {
                log::debug!("[Bootstrap] Already started ({:?}), skipping", *state);
                return *state;
            }
            *state = SessionState::Bootstrapping;
        }
        log::info!("[Bootstrap] Starting session bootstrap");

        if let Err(e) = self.ensure_document().await {
            log::error!("[Bootstrap] Failed to create note: {}", e);
            return SessionState::Bootstrapping;
        }
        if let Err(e) = self.load_document().await {
            log::error!("[Bootstrap] Failed to load note: {}", e);
            return SessionState::Bootstrapping;
        }

        *self.state.lock().unwrap() = SessionState::Ready;
        log::info!("[Bootstrap] Session ready");
        SessionState::Ready
    }

    async fn ensure_document(&self) -> Result<()> {
        if let Some(record) = self.store.find_document().await? {
            log::debug!("[Bootstrap] Found document {}", record.id);
            return Ok(());
        }
        let empty = serde_json::to_string(&Delta::new())?;
        let id = self.store.insert_document(&empty).await?;
        log::info!("[Bootstrap] Created document {}", id);
        Ok(())
    }

    async fn load_document(&self) -> Result<()> {
        let record = self
            .store
            .get_document()
            .await?
            .ok_or(SyncError::NoDocument)?;
        let snapshot = DocumentSnapshot::parse(&record.content)?;

        if snapshot.content().is_empty() {
            log::debug!("[Bootstrap] Stored document is empty, nothing to load");
        } else {
            self.surface.load_snapshot(&snapshot, ChangeOrigin::Api)?;
            log::info!(
                "[Bootstrap] Loaded document {} ({} chars)",
                record.id,
                snapshot.content().length()
            );
        }

        if let Some(loaded) = self.surface.snapshot() {
            self.persistence.mark_persisted(loaded.serialize()?);
        }
        Ok(())
    }
}
