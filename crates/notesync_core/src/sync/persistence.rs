//! Snapshot persistence with dedup, bounded retry and in-flight coalescing.
//!
//! A save takes the surface's current snapshot and writes it to the target
//! for the requested mode: the document store in periodic mode, a `snapshot`
//! frame on the channel in live mode. Per pass:
//!
//! 1. No snapshot: nothing to do.
//! 2. Snapshot serializes to the last persisted string: nothing to do.
//! 3. Otherwise attempt the write up to `max_attempts` times, waiting
//!    `base_delay * n` after failed attempt `n`.
//!
//! Only one save runs at a time. A save requested meanwhile returns
//! [`SaveOutcome::Coalesced`] and the running save does one more pass when
//! it finishes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::types::{Mode, SaveOutcome, SaveState, SaveStatus};
use crate::channel::{Frame, MessageChannel};
use crate::error::Result;
use crate::store::DocumentStore;
use crate::surface::{DocumentSnapshot, EditingSurface};

/// Attempt budget and backoff for saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and is at least 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Attempts per save, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff step between attempts.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait after failed attempt `attempt` (1-based), or `None` if it was the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.base_delay * attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300))
    }
}

#[derive(Debug, Default)]
struct PersistState {
    last_persisted: Option<String>,
    in_flight: bool,
    rerun: Option<Mode>,
}

/// Marks a save as in flight; released by [`next_pass`](Self::next_pass) or on drop.
struct InFlight<'a> {
    state: &'a Mutex<PersistState>,
    released: bool,
}

impl InFlight<'_> {
    /// Mode of a save requested while this one ran, or release if there was none.
    fn next_pass(&mut self) -> Option<Mode> {
        let mut state = self.state.lock().unwrap();
        let next = state.rerun.take();
        if next.is_none() {
            state.in_flight = false;
            self.released = true;
        }
        next
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.released {
            let mut state = self.state.lock().unwrap();
            state.in_flight = false;
            state.rerun = None;
        }
    }
}

/// Owns the last-persisted marker and the save status.
pub struct PersistenceManager {
    surface: Arc<dyn EditingSurface>,
    store: Arc<dyn DocumentStore>,
    channel: Arc<dyn MessageChannel>,
    policy: RetryPolicy,
    state: Mutex<PersistState>,
    status: watch::Sender<SaveStatus>,
}

impl PersistenceManager {
    /// Create a manager with no persisted snapshot yet.
    pub fn new(
        surface: Arc<dyn EditingSurface>,
        store: Arc<dyn DocumentStore>,
        channel: Arc<dyn MessageChannel>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            surface,
            store,
            channel,
            policy,
            state: Mutex::new(PersistState::default()),
            status: watch::Sender::new(SaveStatus::default()),
        }
    }

    /// Persist the current snapshot to the target for `mode`.
    pub async fn save(&self, mode: Mode) -> SaveOutcome {
        let Some(mut in_flight) = self.begin(mode) else {
            log::debug!("[Persistence] Save already in flight, coalescing");
            return SaveOutcome::Coalesced;
        };

        let outcome = self.save_pass(mode).await;
        while let Some(next) = in_flight.next_pass() {
            log::debug!("[Persistence] Running coalesced save ({} mode)", next);
            self.save_pass(next).await;
        }
        outcome
    }

    /// Current save status.
    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Watch save status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Record `serialized` as already persisted (e.g. just loaded from the store).
    pub fn mark_persisted(&self, serialized: String) {
        self.state.lock().unwrap().last_persisted = Some(serialized);
    }

    /// The last serialization written successfully.
    pub fn last_persisted(&self) -> Option<String> {
        self.state.lock().unwrap().last_persisted.clone()
    }

    /// Retry policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn begin(&self, mode: Mode) -> Option<InFlight<'_>> {
        let mut state = self.state.lock().unwrap();
        if state.in_flight {
            state.rerun = Some(mode);
            return None;
        }
        state.in_flight = true;
        Some(InFlight {
            state: &self.state,
            released: false,
        })
    }

    fn is_persisted(&self, serialized: &str) -> bool {
        self.state.lock().unwrap().last_persisted.as_deref() == Some(serialized)
    }

    fn set_state(&self, state: SaveState) {
        self.status.send_modify(|status| status.state = state);
    }

    async fn save_pass(&self, mode: Mode) -> SaveOutcome {
        let Some(snapshot) = self.surface.snapshot() else {
            log::debug!("[Persistence] No snapshot available, skipping save");
            return SaveOutcome::NoSnapshot;
        };
        let serialized = match snapshot.serialize() {
            Ok(serialized) => serialized,
            Err(e) => {
                log::error!("[Persistence] Failed to serialize snapshot: {}", e);
                self.set_state(SaveState::Error);
                return SaveOutcome::Failed {
                    attempts: 0,
                    error: e.to_string(),
                };
            }
        };
        if self.is_persisted(&serialized) {
            log::debug!("[Persistence] Snapshot unchanged, skipping save");
            return SaveOutcome::Unchanged;
        }

        self.set_state(SaveState::Saving);
        let mut attempt = 1;
        loop {
            let error = match self.persist(mode, &snapshot, &serialized).await {
                Ok(()) => break,
                Err(e) => e,
            };
            match self.policy.delay_after(attempt) {
                Some(delay) => {
                    log::warn!(
                        "[Persistence] Save attempt {} failed: {}. Retrying in {:?}",
                        attempt,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    log::error!(
                        "[Persistence] Failed to save note after {} attempts: {}",
                        attempt,
                        error
                    );
                    self.set_state(SaveState::Error);
                    return SaveOutcome::Failed {
                        attempts: attempt,
                        error: error.to_string(),
                    };
                }
            }
        }

        self.mark_persisted(serialized);
        let saved_at = chrono::Utc::now().timestamp_millis();
        self.status.send_replace(SaveStatus {
            state: SaveState::Saved,
            last_saved_at: Some(saved_at),
        });
        log::info!("[Persistence] Saved note ({} mode, attempt {})", mode, attempt);
        SaveOutcome::Saved { attempts: attempt }
    }

    async fn persist(&self, mode: Mode, snapshot: &DocumentSnapshot, serialized: &str) -> Result<()> {
        match mode {
            Mode::Periodic => self.store.update_document(serialized).await,
            Mode::Live => {
                let payload = Frame::Snapshot(snapshot.content().clone()).encode()?;
                self.channel.send(payload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::store::MemoryStore;
    use crate::surface::TextSurface;
    use crate::test_utils::DetachedSurface;
    use tokio::time::Instant;

    struct Fixture {
        surface: Arc<TextSurface>,
        store: Arc<MemoryStore>,
        channel: Arc<MemoryChannel>,
        persistence: Arc<PersistenceManager>,
    }

    fn fixture(text: &str) -> Fixture {
        let surface = Arc::new(TextSurface::with_text(text));
        let store = Arc::new(MemoryStore::with_document(r#"{"ops":[]}"#));
        let (channel, _receiver) = MemoryChannel::new();
        let channel = Arc::new(channel);
        let persistence = Arc::new(PersistenceManager::new(
            surface.clone(),
            store.clone(),
            channel.clone(),
            RetryPolicy::default(),
        ));
        Fixture {
            surface,
            store,
            channel,
            persistence,
        }
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(300)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(600)));
        assert_eq!(policy.delay_after(3), None);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_save_writes_store() {
        let f = fixture("Hello");
        let outcome = f.persistence.save(Mode::Periodic).await;

        assert_eq!(outcome, SaveOutcome::Saved { attempts: 1 });
        assert_eq!(
            f.store.content().as_deref(),
            Some(r#"{"ops":[{"insert":"Hello"}]}"#)
        );
        let status = f.persistence.status();
        assert_eq!(status.state, SaveState::Saved);
        assert!(status.last_saved_at.is_some());
        assert!(f.channel.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_snapshot_is_not_rewritten() {
        let f = fixture("Hello");
        f.persistence.save(Mode::Periodic).await;
        assert_eq!(f.persistence.save(Mode::Periodic).await, SaveOutcome::Unchanged);
        assert_eq!(f.store.update_count(), 1);

        f.surface.append_text("!").unwrap();
        assert!(f.persistence.save(Mode::Periodic).await.is_saved());
        assert_eq!(f.store.update_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_linear_backoff() {
        let f = fixture("Hello");
        f.store.fail_next_writes(2);

        let started = Instant::now();
        let outcome = f.persistence.save(Mode::Periodic).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, SaveOutcome::Saved { attempts: 3 });
        assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1000), "{:?}", elapsed);
        assert_eq!(f.store.update_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_error() {
        let f = fixture("Hello");
        f.store.fail_next_writes(10);

        let started = Instant::now();
        let outcome = f.persistence.save(Mode::Periodic).await;
        let elapsed = started.elapsed();

        assert!(matches!(outcome, SaveOutcome::Failed { attempts: 3, .. }));
        // waits 300ms and 600ms, none after the last attempt
        assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1000), "{:?}", elapsed);
        assert_eq!(f.store.update_count(), 3);
        assert_eq!(f.persistence.status().state, SaveState::Error);
        assert_eq!(f.persistence.status().last_saved_at, None);
        assert!(f.persistence.last_persisted().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_previous_timestamp_and_retries_later() {
        let f = fixture("Hello");
        f.persistence.save(Mode::Periodic).await;
        let first = f.persistence.status().last_saved_at;

        f.surface.append_text(" world").unwrap();
        f.store.fail_next_writes(3);
        f.persistence.save(Mode::Periodic).await;
        assert_eq!(f.persistence.status().state, SaveState::Error);
        assert_eq!(f.persistence.status().last_saved_at, first);

        assert!(f.persistence.save(Mode::Periodic).await.is_saved());
        assert_eq!(
            f.store.content().as_deref(),
            Some(r#"{"ops":[{"insert":"Hello world"}]}"#)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_save_sends_snapshot_frame() {
        let f = fixture("Hello");
        let outcome = f.persistence.save(Mode::Live).await;

        assert!(outcome.is_saved());
        assert_eq!(
            f.channel.sent_frames(),
            vec![Frame::Snapshot(crate::delta::Delta::new().insert("Hello", None))]
        );
        assert_eq!(f.store.update_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_snapshot_is_a_no_op() {
        let store = Arc::new(MemoryStore::with_document("{}"));
        let (channel, _receiver) = MemoryChannel::new();
        let persistence = PersistenceManager::new(
            Arc::new(DetachedSurface),
            store.clone(),
            Arc::new(channel),
            RetryPolicy::default(),
        );

        assert_eq!(persistence.save(Mode::Periodic).await, SaveOutcome::NoSnapshot);
        assert_eq!(store.update_count(), 0);
        assert_eq!(persistence.status(), SaveStatus::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_save_is_coalesced() {
        let f = fixture("a");
        f.store.fail_next_writes(1);

        let persistence = Arc::clone(&f.persistence);
        let first = tokio::spawn(async move { persistence.save(Mode::Periodic).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.persistence.status().state, SaveState::Saving);

        f.surface.append_text("b").unwrap();
        assert_eq!(f.persistence.save(Mode::Periodic).await, SaveOutcome::Coalesced);

        assert_eq!(first.await.unwrap(), SaveOutcome::Saved { attempts: 2 });
        // failed write, retry of "a", coalesced pass with "ab"
        assert_eq!(f.store.update_count(), 3);
        assert_eq!(
            f.store.content().as_deref(),
            Some(r#"{"ops":[{"insert":"ab"}]}"#)
        );

        assert_eq!(f.persistence.save(Mode::Periodic).await, SaveOutcome::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_save_releases_in_flight() {
        let f = fixture("a");
        f.store.fail_next_writes(1);

        let persistence = Arc::clone(&f.persistence);
        let first = tokio::spawn(async move { persistence.save(Mode::Periodic).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();
        let _ = first.await;

        assert!(f.persistence.save(Mode::Periodic).await.is_saved());
    }
}
