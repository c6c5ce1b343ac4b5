pub mod document;
pub mod ws;

use std::sync::Arc;

use crate::room::RelayRoom;

pub use document::document_handler;
pub use ws::ws_handler;

/// Shared state for the relay routes
#[derive(Clone)]
pub struct RelayState {
    pub room: Arc<RelayRoom>,
}
