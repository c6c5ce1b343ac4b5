use std::sync::Arc;

use tokio::sync::watch;

use super::types::Mode;

/// Holds the current sync mode.
///
/// Cheap to clone; all clones share one value. Readers consult it at the
/// moment they act (flush, autosave tick), so a switch takes effect for the
/// next decision without touching anything already sent or in flight.
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: Arc<watch::Sender<Mode>>,
}

impl ModeController {
    /// Create a controller starting in `initial`.
    pub fn new(initial: Mode) -> Self {
        Self {
            mode: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Current mode.
    pub fn get(&self) -> Mode {
        *self.mode.borrow()
    }

    /// Switch modes. Returns the previous mode.
    pub fn set_mode(&self, mode: Mode) -> Mode {
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            log::info!("[ModeController] Sync mode {} -> {}", previous, mode);
        }
        previous
    }

    /// Watch for mode changes.
    pub fn subscribe(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_mode() {
        let controller = ModeController::new(Mode::Live);
        let other = controller.clone();

        assert_eq!(other.set_mode(Mode::Periodic), Mode::Live);
        assert_eq!(controller.get(), Mode::Periodic);
    }

    #[tokio::test]
    async fn test_subscribe_sees_switch() {
        let controller = ModeController::default();
        let mut receiver = controller.subscribe();

        controller.set_mode(Mode::Periodic);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), Mode::Periodic);
    }
}
