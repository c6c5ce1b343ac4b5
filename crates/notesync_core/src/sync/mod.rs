//! Synchronization components.
//!
//! ```text
//!                 user edits                         inbound payloads
//!                     |                                     |
//!   EditingSurface ---+--> TransportDispatcher      RemoteUpdateGate
//!        ^                  (debounce, compose)             |
//!        |                    |             |               |
//!        |            live: operation   periodic:           |
//!        |              frame            save               |
//!        |                    v             v               |
//!        |            MessageChannel  PersistenceManager    |
//!        |                             (dedup, retry)       |
//!        +-------------------------------------------------+
//!                       apply (origin = remote)
//! ```
//!
//! [`SyncSession`] wires these together for one document.
//! [`BootstrapSequencer`] loads the stored document once at startup and
//! [`ModeController`] decides where flushes and saves go.

mod autosave;
mod bootstrap;
mod buffer;
mod debounce;
mod dispatcher;
mod gate;
mod mode;
mod persistence;
mod session;
mod types;

pub use autosave::{AutosaveHandle, spawn_autosave};
pub use bootstrap::BootstrapSequencer;
pub use buffer::OperationBuffer;
pub use debounce::Debouncer;
pub use dispatcher::TransportDispatcher;
pub use gate::RemoteUpdateGate;
pub use mode::ModeController;
pub use persistence::{PersistenceManager, RetryPolicy};
pub use session::SyncSession;
pub use types::{InboundOutcome, Mode, SaveOutcome, SaveState, SaveStatus, SessionState};
