use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::InboundOutcome;
use crate::channel::Frame;
use crate::surface::{ChangeOrigin, EditingSurface};

/// Applies operations received from the channel to the local surface.
///
/// Changes are applied with [`ChangeOrigin::Remote`], which the dispatcher
/// ignores, so nothing applied here is sent back out. Bad payloads are logged
/// and dropped; the gate never returns an error.
pub struct RemoteUpdateGate {
    surface: Arc<dyn EditingSurface>,
    applied: AtomicUsize,
    rejected: AtomicUsize,
}

impl RemoteUpdateGate {
    /// Create a gate that applies to `surface`.
    pub fn new(surface: Arc<dyn EditingSurface>) -> Self {
        Self {
            surface,
            applied: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        }
    }

    /// Handle one raw inbound payload.
    pub fn on_channel_message(&self, payload: &[u8]) -> InboundOutcome {
        let frame = match Frame::decode(payload) {
            Ok(frame) => frame,
            Err(e) => {
                return self.reject(format!("malformed payload ({} bytes): {}", payload.len(), e));
            }
        };

        let change = match frame {
            Frame::Operation(change) => change,
            Frame::Snapshot(_) => {
                log::debug!("[RemoteGate] Ignoring snapshot frame");
                return InboundOutcome::Ignored;
            }
        };

        if let Err(e) = change.validate() {
            return self.reject(format!("invalid operation: {}", e));
        }

        match self.surface.apply_operation(&change, ChangeOrigin::Remote) {
            Ok(()) => {
                self.applied.fetch_add(1, Ordering::SeqCst);
                log::debug!("[RemoteGate] Applied remote operation ({} ops)", change.ops().len());
                InboundOutcome::Applied
            }
            Err(e) => self.reject(format!("operation does not fit the document: {}", e)),
        }
    }

    /// Payloads applied so far.
    pub fn applied_count(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }

    /// Payloads dropped so far.
    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn reject(&self, reason: String) -> InboundOutcome {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        log::warn!("[RemoteGate] Dropping inbound message: {}", reason);
        InboundOutcome::Rejected { reason }
    }
}
