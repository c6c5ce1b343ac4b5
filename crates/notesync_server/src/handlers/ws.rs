use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use super::RelayState;

/// WebSocket upgrade handler
pub async fn ws_handler(State(state): State<RelayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut connection = state.room.join();
    let peer = connection.id();

    info!(
        "WebSocket connected: peer={}, connections={}",
        peer,
        state.room.connection_count()
    );

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let payload = match msg {
                    Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Peer {} closed the connection", peer);
                        break;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                };
                let outcome = connection.handle_payload(payload).await;
                debug!("Peer {}: {:?}", peer, outcome);
            }

            relayed = connection.recv() => {
                let Some(payload) = relayed else { break };
                if let Err(e) = ws_tx.send(to_message(payload.as_slice())).await {
                    error!("Failed to relay frame to peer {}: {}", peer, e);
                    break;
                }
            }
        }
    }

    info!("WebSocket disconnected: peer={}", peer);
}

/// Frames are JSON, so they normally go out as text.
fn to_message(payload: &[u8]) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::Text(text.into()),
        Err(e) => Message::Binary(e.into_bytes().into()),
    }
}
