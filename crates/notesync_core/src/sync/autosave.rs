use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::mode::ModeController;
use super::persistence::PersistenceManager;
use super::types::Mode;

/// Handle to a running autosave task. Dropping it stops the task.
#[derive(Debug)]
pub struct AutosaveHandle {
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Stop the autosave task.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Save every `interval` while the mode is periodic.
///
/// Ticks in live mode are skipped. Saves go through the persistence manager,
/// so unchanged snapshots cost nothing and overlapping saves coalesce.
pub fn spawn_autosave(
    persistence: Arc<PersistenceManager>,
    mode: ModeController,
    interval: Duration,
) -> AutosaveHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if mode.get() != Mode::Periodic {
                continue;
            }
            log::trace!("[Autosave] Tick");
            persistence.save(Mode::Periodic).await;
        }
    });
    AutosaveHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::store::MemoryStore;
    use crate::surface::TextSurface;
    use crate::sync::RetryPolicy;

    fn persistence(surface: Arc<TextSurface>, store: Arc<MemoryStore>) -> Arc<PersistenceManager> {
        let (channel, _receiver) = MemoryChannel::new();
        Arc::new(PersistenceManager::new(
            surface,
            store,
            Arc::new(channel),
            RetryPolicy::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_on_interval_in_periodic_mode() {
        let surface = Arc::new(TextSurface::with_text("draft"));
        let store = Arc::new(MemoryStore::with_document("{}"));
        let mode = ModeController::new(Mode::Periodic);
        let _handle = spawn_autosave(
            persistence(surface.clone(), store.clone()),
            mode,
            Duration::from_millis(2000),
        );

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(store.update_count(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.update_count(), 1);

        // unchanged snapshot: ticks are no-ops
        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(store.update_count(), 1);

        surface.append_text(" v2").unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(store.update_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_ticks_in_live_mode() {
        let surface = Arc::new(TextSurface::with_text("draft"));
        let store = Arc::new(MemoryStore::with_document("{}"));
        let mode = ModeController::new(Mode::Live);
        let _handle = spawn_autosave(
            persistence(surface, store.clone()),
            mode.clone(),
            Duration::from_millis(2000),
        );

        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert_eq!(store.update_count(), 0);

        mode.set_mode(Mode::Periodic);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop() {
        let surface = Arc::new(TextSurface::with_text("draft"));
        let store = Arc::new(MemoryStore::with_document("{}"));
        let handle = spawn_autosave(
            persistence(surface, store.clone()),
            ModeController::new(Mode::Periodic),
            Duration::from_millis(2000),
        );

        handle.stop();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(store.update_count(), 0);
        assert!(!handle.is_running());
    }
}
