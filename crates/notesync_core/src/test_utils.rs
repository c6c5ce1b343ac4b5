//! Test helpers shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::delta::Delta;
use crate::error::{Result, SyncError};
use crate::surface::{ChangeListener, ChangeOrigin, DocumentSnapshot, EditingSurface};

/// Surface that is not mounted: no snapshot, rejects every change.
pub struct DetachedSurface;

impl EditingSurface for DetachedSurface {
    fn snapshot(&self) -> Option<DocumentSnapshot> {
        None
    }

    fn apply_operation(&self, _change: &Delta, _origin: ChangeOrigin) -> Result<()> {
        Err(SyncError::ReadOnly)
    }

    fn load_snapshot(&self, _snapshot: &DocumentSnapshot, _origin: ChangeOrigin) -> Result<()> {
        Err(SyncError::ReadOnly)
    }

    fn subscribe(&self, _listener: ChangeListener) {}
}

/// Counts surface change notifications by origin.
#[derive(Debug, Default)]
pub struct OriginCounter {
    user: AtomicUsize,
    remote: AtomicUsize,
    api: AtomicUsize,
}

impl OriginCounter {
    /// Subscribe a counter to `surface`.
    pub fn attach(surface: &dyn EditingSurface) -> Arc<Self> {
        let counter = Arc::new(Self::default());
        let sink = Arc::clone(&counter);
        surface.subscribe(Arc::new(move |_change: &Delta, origin: ChangeOrigin| {
            let slot = match origin {
                ChangeOrigin::User => &sink.user,
                ChangeOrigin::Remote => &sink.remote,
                ChangeOrigin::Api => &sink.api,
            };
            slot.fetch_add(1, Ordering::SeqCst);
        }));
        counter
    }

    /// Changes seen with `User` origin.
    pub fn user(&self) -> usize {
        self.user.load(Ordering::SeqCst)
    }

    /// Changes seen with `Remote` origin.
    pub fn remote(&self) -> usize {
        self.remote.load(Ordering::SeqCst)
    }

    /// Changes seen with `Api` origin.
    pub fn api(&self) -> usize {
        self.api.load(Ordering::SeqCst)
    }
}
