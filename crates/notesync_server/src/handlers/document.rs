use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::RelayState;

/// Return the stored document's content as JSON.
pub async fn document_handler(State(state): State<RelayState>) -> Response {
    match state.room.store().get_document().await {
        Ok(Some(record)) => (
            [(header::CONTENT_TYPE, "application/json")],
            record.content,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No document stored").into_response(),
        Err(e) => {
            error!("Failed to read document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
