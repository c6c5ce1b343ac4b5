use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::autosave::{AutosaveHandle, spawn_autosave};
use super::bootstrap::BootstrapSequencer;
use super::dispatcher::TransportDispatcher;
use super::gate::RemoteUpdateGate;
use super::mode::ModeController;
use super::persistence::PersistenceManager;
use super::types::{InboundOutcome, Mode, SaveOutcome, SaveStatus, SessionState};
use crate::channel::MessageChannel;
use crate::config::SyncConfig;
use crate::delta::Delta;
use crate::store::DocumentStore;
use crate::surface::{ChangeOrigin, EditingSurface};

/// A collaborative editing session over one document.
///
/// Wires the surface, store and channel to the sync components:
///
/// - surface changes feed the [`TransportDispatcher`],
/// - inbound channel payloads go through the [`RemoteUpdateGate`],
/// - saves, explicit or automatic, go through the [`PersistenceManager`].
///
/// Must be created from within a tokio runtime.
pub struct SyncSession {
    surface: Arc<dyn EditingSurface>,
    channel: Arc<dyn MessageChannel>,
    mode: ModeController,
    dispatcher: Arc<TransportDispatcher>,
    gate: RemoteUpdateGate,
    persistence: Arc<PersistenceManager>,
    bootstrap: BootstrapSequencer,
    config: SyncConfig,
}

impl SyncSession {
    /// Wire the components together and start the outbound task.
    pub fn new(
        surface: Arc<dyn EditingSurface>,
        store: Arc<dyn DocumentStore>,
        channel: Arc<dyn MessageChannel>,
        config: SyncConfig,
    ) -> Self {
        let mode = ModeController::new(config.initial_mode);
        let persistence = Arc::new(PersistenceManager::new(
            Arc::clone(&surface),
            Arc::clone(&store),
            Arc::clone(&channel),
            config.retry_policy(),
        ));
        let dispatcher = Arc::new(TransportDispatcher::new(
            Arc::clone(&channel),
            Arc::clone(&persistence),
            mode.clone(),
            config.debounce_window(),
        ));

        let listener = Arc::downgrade(&dispatcher);
        surface.subscribe(Arc::new(move |change: &Delta, origin: ChangeOrigin| {
            if let Some(dispatcher) = listener.upgrade() {
                dispatcher.on_local_change(change, origin);
            }
        }));

        let gate = RemoteUpdateGate::new(Arc::clone(&surface));
        let bootstrap = BootstrapSequencer::new(store, Arc::clone(&surface), Arc::clone(&persistence));
        log::info!("[SyncSession] Session created ({} mode)", config.initial_mode);

        Self {
            surface,
            channel,
            mode,
            dispatcher,
            gate,
            persistence,
            bootstrap,
            config,
        }
    }

    /// Feed a surface change to the dispatcher.
    ///
    /// Changes made through the surface are delivered automatically; this is
    /// for surfaces that report changes out of band.
    pub fn on_local_change(&self, change: &Delta, origin: ChangeOrigin) -> bool {
        self.dispatcher.on_local_change(change, origin)
    }

    /// Apply one inbound channel payload.
    pub fn on_channel_message(&self, payload: &[u8]) -> InboundOutcome {
        self.gate.on_channel_message(payload)
    }

    /// Drive the gate from an inbound payload stream until it closes.
    pub async fn run_inbound(&self, mut inbound: mpsc::UnboundedReceiver<Vec<u8>>) {
        while let Some(payload) = inbound.recv().await {
            self.on_channel_message(&payload);
        }
        log::info!("[SyncSession] Inbound stream closed");
    }

    /// Persist the current snapshot to the target for `mode`.
    pub async fn save(&self, mode: Mode) -> SaveOutcome {
        self.persistence.save(mode).await
    }

    /// Persist using the current mode.
    pub async fn save_now(&self) -> SaveOutcome {
        self.save(self.mode()).await
    }

    /// Create or load the document. Runs once per session.
    pub async fn bootstrap(&self) -> SessionState {
        self.bootstrap.bootstrap().await
    }

    /// Switch modes. Returns the previous mode.
    pub fn set_mode(&self, mode: Mode) -> Mode {
        self.mode.set_mode(mode)
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// Current save status.
    pub fn save_status(&self) -> SaveStatus {
        self.persistence.status()
    }

    /// Watch save status changes.
    pub fn subscribe_save_status(&self) -> watch::Receiver<SaveStatus> {
        self.persistence.subscribe_status()
    }

    /// Watch mode changes.
    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }

    /// Bootstrap progress.
    pub fn session_state(&self) -> SessionState {
        self.bootstrap.state()
    }

    /// Start autosaving at the configured interval.
    pub fn spawn_autosave(&self) -> AutosaveHandle {
        spawn_autosave(
            Arc::clone(&self.persistence),
            self.mode.clone(),
            self.config.autosave_interval(),
        )
    }

    /// Flush buffered edits without waiting for the debounce window.
    pub fn flush(&self) {
        self.dispatcher.flush_now();
    }

    /// Flush buffered edits and close the channel.
    pub async fn shutdown(&self) {
        self.flush();
        self.dispatcher.drain().await;
        if let Err(e) = self.channel.close().await {
            log::warn!("[SyncSession] Failed to close channel: {}", e);
        }
        log::info!("[SyncSession] Session closed");
    }

    /// The editing surface this session drives.
    pub fn surface(&self) -> &Arc<dyn EditingSurface> {
        &self.surface
    }

    /// The config the session was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Local changes captured for transmission so far.
    pub fn captured_count(&self) -> usize {
        self.dispatcher.captured_count()
    }

    /// Inbound operations applied so far.
    pub fn applied_count(&self) -> usize {
        self.gate.applied_count()
    }
}
