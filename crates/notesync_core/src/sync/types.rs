//! Shared state and result types for the sync components.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sync mode.
///
/// In `Live` mode flushed operations go to the message channel and explicit
/// saves send a snapshot frame. In `Periodic` mode flushes trigger a store
/// save and the autosave timer is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Mode {
    /// Stream operations to peers.
    #[default]
    Live,
    /// Save to the store on flush and on a timer.
    Periodic,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Live => write!(f, "live"),
            Mode::Periodic => write!(f, "periodic"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" | "realtime" => Ok(Mode::Live),
            "periodic" => Ok(Mode::Periodic),
            _ => Err(format!("Unknown sync mode: {}", s)),
        }
    }
}

/// Persistence state shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SaveState {
    /// Nothing saved yet.
    #[default]
    Idle,
    /// A save is running.
    Saving,
    /// The last save succeeded.
    Saved,
    /// The last save failed after every retry.
    Error,
}

/// Observable persistence status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SaveStatus {
    /// Current state.
    pub state: SaveState,
    /// Unix milliseconds of the last successful save.
    pub last_saved_at: Option<i64>,
}

impl SaveStatus {
    /// Human-readable status line.
    pub fn describe(&self) -> String {
        match self.state {
            SaveState::Idle => "Not saved yet".to_string(),
            SaveState::Saving => "Saving…".to_string(),
            SaveState::Error => "Error saving".to_string(),
            SaveState::Saved => match self
                .last_saved_at
                .and_then(chrono::DateTime::from_timestamp_millis)
            {
                Some(at) => format!(
                    "Saved at {}",
                    at.with_timezone(&chrono::Local).format("%H:%M:%S")
                ),
                None => "Saved".to_string(),
            },
        }
    }
}

/// Bootstrap progress of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SessionState {
    /// `bootstrap` has not been called.
    #[default]
    Uninitialized,
    /// Bootstrap started; stays here if it failed.
    Bootstrapping,
    /// The document is loaded.
    Ready,
}

/// Result of a `save` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The surface had nothing to snapshot.
    NoSnapshot,
    /// The snapshot matches the last persisted one.
    Unchanged,
    /// Persisted after `attempts` tries.
    Saved {
        /// Attempts used, the successful one included.
        attempts: u32,
    },
    /// Every attempt failed.
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        error: String,
    },
    /// Another save was in flight; it will run again when it finishes.
    Coalesced,
}

impl SaveOutcome {
    /// Whether the save wrote the snapshot.
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// What the remote gate did with an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Applied to the surface.
    Applied,
    /// Well-formed but not meant for peers (snapshot frames).
    Ignored,
    /// Dropped: malformed, structurally invalid, or did not fit the document.
    Rejected {
        /// Why the payload was dropped.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("live".parse::<Mode>().unwrap(), Mode::Live);
        assert_eq!("realtime".parse::<Mode>().unwrap(), Mode::Live);
        assert_eq!("periodic".parse::<Mode>().unwrap(), Mode::Periodic);
        assert!("hourly".parse::<Mode>().is_err());
        assert_eq!(Mode::Periodic.to_string(), "periodic");
    }

    #[test]
    fn test_status_describe() {
        assert_eq!(SaveStatus::default().describe(), "Not saved yet");

        let saving = SaveStatus {
            state: SaveState::Saving,
            last_saved_at: None,
        };
        assert_eq!(saving.describe(), "Saving…");

        let saved = SaveStatus {
            state: SaveState::Saved,
            last_saved_at: Some(1_700_000_000_000),
        };
        let line = saved.describe();
        assert!(line.starts_with("Saved at "));
        assert_eq!(line.len(), "Saved at 00:00:00".len());
    }

    #[test]
    fn test_status_json_shape() {
        let status = SaveStatus {
            state: SaveState::Error,
            last_saved_at: Some(42),
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"state": "error", "lastSavedAt": 42})
        );
    }
}
