//! Notesync Relay Server
//!
//! The peer every notesync client connects to. It forwards incremental edit
//! frames between clients and stores the full-document snapshots that
//! live-mode clients send.
//!
//! ## Routes
//!
//! - `GET /`: health text
//! - `GET /document`: the stored document as JSON, 404 if none
//! - `GET {RELAY_PATH}`: WebSocket relay (default `/collaborate`)
//!
//! ## Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3300)
//! - `DATABASE_PATH`: Path to SQLite database (default: ./notesync_server.db)
//! - `RELAY_PATH`: WebSocket route (default: /collaborate)

pub mod config;
pub mod handlers;
pub mod room;

use std::path::Path;
use std::sync::Arc;

use axum::{Router, routing::get};
use notesync_core::store::{DocumentStore, MemoryStore, SqliteStore};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub use config::Config;
use handlers::{RelayState, document_handler, ws_handler};
pub use room::RelayRoom;

/// Open the SQLite store, falling back to memory if the file can't be used.
pub fn open_store(path: &Path) -> Arc<dyn DocumentStore> {
    match SqliteStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open database {:?}: {}", path, e);
            warn!("Falling back to in-memory storage; snapshots will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Build the router
pub fn app(room: Arc<RelayRoom>, relay_path: &str) -> Router {
    let state = RelayState { room };
    Router::new()
        .route("/", get(|| async { "Notesync Relay Server" }))
        .route("/document", get(document_handler))
        .route(relay_path, get(ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
