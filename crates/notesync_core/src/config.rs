//! Configuration for a sync session.
//!
//! [`SyncConfig`] holds the timing constants and connection settings. It is
//! persisted as TOML (typically at `~/.config/notesync/config.toml`) and every
//! field has a default, so a partial file is valid:
//!
//! ```toml
//! debounce_ms = 150
//! initial_mode = "periodic"
//! ```
//!
//! `SOCKET_URL` and `DATABASE_PATH` in the environment override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sync::{Mode, RetryPolicy};

/// Default relay endpoint.
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:3300/collaborate";

/// Settings for a [`SyncSession`](crate::sync::SyncSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last local edit before the buffer is flushed.
    pub debounce_ms: u64,

    /// Persistence attempts per save, first attempt included.
    pub max_save_attempts: u32,

    /// Backoff unit; attempt `n` is followed by a wait of `n` units.
    pub retry_base_delay_ms: u64,

    /// Autosave period, only used in periodic mode.
    pub autosave_interval_ms: u64,

    /// Mode the session starts in.
    pub initial_mode: Mode,

    /// Relay WebSocket endpoint.
    pub socket_url: String,

    /// SQLite database used by clients without a relay.
    pub database_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            max_save_attempts: 3,
            retry_base_delay_ms: 300,
            autosave_interval_ms: 2000,
            initial_mode: Mode::Live,
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            database_path: PathBuf::from("notesync.db"),
        }
    }
}

impl SyncConfig {
    /// Parse a config from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load config from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load config from `path`, or return the defaults if it doesn't exist.
    pub fn load_from_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("[Config] No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Write config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config location (`~/.config/notesync/config.toml` on Linux).
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("notesync").join("config.toml"))
    }

    /// Apply `SOCKET_URL` / `DATABASE_PATH` from the process environment.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SOCKET_URL").filter(|v| !v.is_empty()) {
            self.socket_url = url;
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        self
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Autosave interval as a [`Duration`].
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }

    /// Retry policy for saves.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_save_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}
