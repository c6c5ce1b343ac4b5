use thiserror::Error;

use crate::delta::DeltaError;

/// Unified error type for notesync operations
#[derive(Debug, Error)]
pub enum SyncError {
    // IO errors
    /// I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Operation errors
    /// A delta failed validation or did not fit the document.
    #[error("Invalid operation: {0}")]
    InvalidDelta(#[from] DeltaError),

    // Store errors
    /// The document store failed.
    #[error("Document store error: {0}")]
    Store(String),

    /// An update found no record to write to.
    #[error("No document record exists in the store")]
    NoDocument,

    /// SQLite failure.
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // Channel errors
    /// The message channel failed.
    #[error("Message channel error: {0}")]
    Channel(String),

    /// The message channel was closed.
    #[error("Message channel is closed")]
    ChannelClosed,

    // Surface errors
    /// A user edit hit a read-only surface.
    #[error("Editing surface is read-only")]
    ReadOnly,

    // Config errors
    /// The config file is not valid TOML for [`SyncConfig`](crate::config::SyncConfig).
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config could not be written as TOML.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type alias for notesync operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Short, stable name of the error kind (used in log lines and by the relay).
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Io(_) => "Io",
            SyncError::Json(_) => "Json",
            SyncError::InvalidDelta(_) => "InvalidDelta",
            SyncError::Store(_) => "Store",
            SyncError::NoDocument => "NoDocument",
            #[cfg(feature = "sqlite")]
            SyncError::Sqlite(_) => "Sqlite",
            SyncError::Channel(_) => "Channel",
            SyncError::ChannelClosed => "ChannelClosed",
            SyncError::ReadOnly => "ReadOnly",
            SyncError::ConfigParse(_) => "ConfigParse",
            SyncError::ConfigSerialize(_) => "ConfigSerialize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_message() {
        let err = SyncError::Store("connection refused".to_string());
        assert_eq!(err.kind(), "Store");
        assert_eq!(err.to_string(), "Document store error: connection refused");
    }

    #[test]
    fn test_delta_error_converts() {
        let err: SyncError = DeltaError::EmptyOps.into();
        assert_eq!(err.kind(), "InvalidDelta");
    }
}
