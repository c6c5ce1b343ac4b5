//! Debounced capture of local edits.
//!
//! Every user-originated change is composed into an [`OperationBuffer`] and
//! restarts the debounce window. When the window elapses without another
//! edit, the buffer is taken whole and routed by the mode active at that
//! moment:
//!
//! - `Live`: one `operation` frame on the message channel.
//! - `Periodic`: a store save of the current snapshot.
//!
//! Routed work goes through a single outbound queue drained by one task, so
//! frames reach the channel in flush order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::buffer::OperationBuffer;
use super::debounce::Debouncer;
use super::mode::ModeController;
use super::persistence::PersistenceManager;
use super::types::Mode;
use crate::channel::{Frame, MessageChannel};
use crate::delta::Delta;
use crate::surface::ChangeOrigin;

#[derive(Debug)]
enum Outbound {
    Operation(Delta),
    Persist,
    Barrier(oneshot::Sender<()>),
}

/// Buffers local operations and routes them to the active transport.
pub struct TransportDispatcher {
    buffer: Arc<Mutex<OperationBuffer>>,
    debouncer: Debouncer,
    window: Duration,
    mode: ModeController,
    outbound: mpsc::UnboundedSender<Outbound>,
    captured: AtomicUsize,
}

impl TransportDispatcher {
    /// Create a dispatcher and spawn its outbound task.
    ///
    /// Must be called from within a tokio runtime. The outbound task exits
    /// when the dispatcher is dropped.
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        persistence: Arc<PersistenceManager>,
        mode: ModeController,
        window: Duration,
    ) -> Self {
        let (outbound, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_outbound(receiver, channel, persistence));

        Self {
            buffer: Arc::new(Mutex::new(OperationBuffer::new())),
            debouncer: Debouncer::new(),
            window,
            mode,
            outbound,
            captured: AtomicUsize::new(0),
        }
    }

    /// Surface change hook. Returns whether the change was captured.
    ///
    /// Only [`ChangeOrigin::User`] changes are captured; remote and api
    /// changes are ignored so applied updates are never echoed back.
    pub fn on_local_change(&self, change: &Delta, origin: ChangeOrigin) -> bool {
        if origin != ChangeOrigin::User {
            log::trace!("[Dispatcher] Ignoring {} change", origin);
            return false;
        }
        if change.is_empty() {
            return false;
        }

        self.buffer.lock().unwrap().compose(change);
        self.captured.fetch_add(1, Ordering::SeqCst);

        let buffer = Arc::clone(&self.buffer);
        let mode = self.mode.clone();
        let outbound = self.outbound.clone();
        self.debouncer.schedule(self.window, move || {
            flush(&buffer, &mode, &outbound);
        });
        true
    }

    /// Flush immediately instead of waiting for the window to elapse.
    pub fn flush_now(&self) {
        self.debouncer.cancel();
        flush(&self.buffer, &self.mode, &self.outbound);
    }

    /// Wait until everything flushed so far has been handed to the channel.
    pub async fn drain(&self) {
        let (done, drained) = oneshot::channel();
        if self.outbound.send(Outbound::Barrier(done)).is_ok() {
            let _ = drained.await;
        }
    }

    /// Number of local changes captured so far.
    pub fn captured_count(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }

    /// Whether a flush is waiting on the debounce window.
    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

fn flush(
    buffer: &Mutex<OperationBuffer>,
    mode: &ModeController,
    outbound: &mpsc::UnboundedSender<Outbound>,
) {
    let (pending, folded) = {
        let mut buffer = buffer.lock().unwrap();
        let folded = buffer.folded();
        (buffer.take(), folded)
    };
    let Some(pending) = pending else {
        log::debug!("[Dispatcher] Nothing to flush");
        return;
    };

    let item = match mode.get() {
        Mode::Live => {
            log::debug!(
                "[Dispatcher] Flushing {} edit(s) as one operation",
                folded
            );
            Outbound::Operation(pending)
        }
        Mode::Periodic => {
            log::debug!("[Dispatcher] Flushing {} edit(s) to the store", folded);
            Outbound::Persist
        }
    };
    if outbound.send(item).is_err() {
        log::warn!("[Dispatcher] Outbound queue closed, dropping flush");
    }
}

async fn run_outbound(
    mut receiver: mpsc::UnboundedReceiver<Outbound>,
    channel: Arc<dyn MessageChannel>,
    persistence: Arc<PersistenceManager>,
) {
    while let Some(item) = receiver.recv().await {
        match item {
            Outbound::Operation(change) => {
                let payload = match Frame::Operation(change).encode() {
                    Ok(payload) => payload,
                    Err(e) => {
                        log::error!("[Dispatcher] Failed to encode operation: {}", e);
                        continue;
                    }
                };
                if let Err(e) = channel.send(payload).await {
                    log::error!("[Dispatcher] Failed to send operation: {}", e);
                }
            }
            Outbound::Persist => {
                let persistence = Arc::clone(&persistence);
                tokio::spawn(async move {
                    persistence.save(Mode::Periodic).await;
                });
            }
            Outbound::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    log::debug!("[Dispatcher] Outbound queue closed");
}
