#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Rich-text operations and their algebra
pub mod delta;

/// Error (common error types)
pub mod error;

/// Editing surface abstraction
pub mod surface;

/// Document store backends
pub mod store;

/// Real-time message channel
pub mod channel;

/// Sync components (dispatcher, gate, persistence, bootstrap)
pub mod sync;

#[cfg(test)]
pub mod test_utils;

pub use config::SyncConfig;
pub use delta::Delta;
pub use error::{Result, SyncError};
pub use store::BoxFuture;
pub use sync::{Mode, SyncSession};
