//! The shared relay room.
//!
//! Every connected peer holds a [`RoomConnection`]. Operation frames are
//! broadcast tagged with the sender's connection id so the sender's own
//! receive loop can skip them. Snapshot frames never reach other peers; the
//! room writes them to its store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use notesync_core::channel::Frame;
use notesync_core::store::DocumentStore;
use notesync_core::surface::DocumentSnapshot;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

/// Connection identifier, unique within a room.
pub type ConnectionId = u64;

/// What the room did with an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Operation frame forwarded to this many other peers.
    Broadcast { receivers: usize },
    /// Snapshot frame written to the store.
    Persisted,
    /// Payload could not be handled.
    Dropped { reason: String },
}

pub struct RelayRoom {
    tx: broadcast::Sender<(ConnectionId, Arc<Vec<u8>>)>,
    next_id: AtomicU64,
    connection_count: AtomicUsize,
    store: Arc<dyn DocumentStore>,
    /// Serializes find-then-write so two snapshots cannot both insert.
    persist_lock: Mutex<()>,
}

impl RelayRoom {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self {
            tx,
            next_id: AtomicU64::new(1),
            connection_count: AtomicUsize::new(0),
            store,
            persist_lock: Mutex::new(()),
        }
    }

    /// Register a new peer.
    pub fn join(self: &Arc<Self>) -> RoomConnection {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let count = self.connection_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Peer {} joined, connections={}", id, count);
        RoomConnection {
            id,
            room: Arc::clone(self),
            rx: self.tx.subscribe(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Route one payload received from `sender`.
    pub async fn handle_payload(&self, sender: ConnectionId, payload: Vec<u8>) -> RelayOutcome {
        let frame = match Frame::decode(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame from peer {}: {}", sender, e);
                return RelayOutcome::Dropped {
                    reason: e.to_string(),
                };
            }
        };

        match frame {
            Frame::Operation(_) => {
                // Subscribers include the sender, which filters itself out.
                let receivers = self
                    .tx
                    .send((sender, Arc::new(payload)))
                    .map(|n| n.saturating_sub(1))
                    .unwrap_or(0);
                debug!("Relayed operation from peer {} to {} peers", sender, receivers);
                RelayOutcome::Broadcast { receivers }
            }
            Frame::Snapshot(content) => match self.persist(content).await {
                Ok(()) => {
                    debug!("Persisted snapshot from peer {}", sender);
                    RelayOutcome::Persisted
                }
                Err(e) => {
                    warn!("Failed to persist snapshot from peer {}: {}", sender, e);
                    RelayOutcome::Dropped {
                        reason: e.to_string(),
                    }
                }
            },
        }
    }

    /// Insert the document if missing, otherwise update it.
    async fn persist(&self, content: notesync_core::Delta) -> notesync_core::Result<()> {
        let serialized = DocumentSnapshot::new(content).serialize()?;
        let _guard = self.persist_lock.lock().await;
        match self.store.find_document().await? {
            Some(_) => self.store.update_document(&serialized).await,
            None => {
                let id = self.store.insert_document(&serialized).await?;
                info!("Created document {}", id);
                Ok(())
            }
        }
    }
}

/// A peer's membership in the room. Dropping it leaves the room.
pub struct RoomConnection {
    id: ConnectionId,
    room: Arc<RelayRoom>,
    rx: broadcast::Receiver<(ConnectionId, Arc<Vec<u8>>)>,
}

impl RoomConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn handle_payload(&self, payload: Vec<u8>) -> RelayOutcome {
        self.room.handle_payload(self.id, payload).await
    }

    /// Next operation frame from another peer. `None` once the room is gone.
    pub async fn recv(&mut self) -> Option<Arc<Vec<u8>>> {
        loop {
            match self.rx.recv().await {
                Ok((sender, _)) if sender == self.id => continue,
                Ok((_, payload)) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Peer {} lagged, skipped {} frames", self.id, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for RoomConnection {
    fn drop(&mut self) {
        let remaining = self.room.connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
        info!("Peer {} left, connections={}", self.id, remaining);
    }
}
