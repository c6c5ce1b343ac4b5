//! End-to-end relay tests over real sockets.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use futures::{SinkExt, StreamExt};
use notesync_core::Delta;
use notesync_core::channel::Frame;
use notesync_core::store::MemoryStore;
use notesync_server::handlers::{RelayState, document_handler};
use notesync_server::{RelayRoom, app};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay(store: Arc<MemoryStore>) -> (String, Arc<RelayRoom>) {
    let room = Arc::new(RelayRoom::new(store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(room.clone(), "/collaborate");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("ws://{}/collaborate", addr), room)
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn wait_for_connections(room: &RelayRoom, count: usize) {
    for _ in 0..200 {
        if room.connection_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} connections, have {}", count, room.connection_count());
}

fn operation(text: &str) -> String {
    String::from_utf8(Frame::Operation(Delta::new().insert(text, None)).encode().unwrap()).unwrap()
}

fn snapshot(text: &str) -> String {
    String::from_utf8(Frame::Snapshot(Delta::new().insert(text, None)).encode().unwrap()).unwrap()
}

async fn next_text(client: &mut Client) -> String {
    let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
        .unwrap();
    msg.into_text().unwrap().as_str().to_string()
}

#[tokio::test]
async fn test_operation_is_relayed_to_other_peer() {
    let (url, room) = start_relay(Arc::new(MemoryStore::new())).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;
    wait_for_connections(&room, 2).await;

    alice.send(Message::text(operation("hello"))).await.unwrap();
    assert_eq!(next_text(&mut bob).await, operation("hello"));

    bob.send(Message::text(operation("back"))).await.unwrap();
    // alice never sees her own frame, so the next one is bob's
    assert_eq!(next_text(&mut alice).await, operation("back"));
}

#[tokio::test]
async fn test_snapshot_is_stored_and_served() {
    let store = Arc::new(MemoryStore::new());
    let (url, room) = start_relay(store.clone()).await;
    let mut peer = connect(&url).await;
    wait_for_connections(&room, 1).await;

    peer.send(Message::text(snapshot("saved\n"))).await.unwrap();
    for _ in 0..200 {
        if store.record_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.content().as_deref(), Some(r#"{"ops":[{"insert":"saved\n"}]}"#));

    let response = document_handler(State(RelayState { room: room.clone() })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_document_missing_is_not_found() {
    let room = Arc::new(RelayRoom::new(Arc::new(MemoryStore::new())));
    let response = document_handler(State(RelayState { room })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let (url, room) = start_relay(Arc::new(MemoryStore::new())).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;
    wait_for_connections(&room, 2).await;

    alice.send(Message::text("{not a frame")).await.unwrap();
    alice.send(Message::text(operation("still here"))).await.unwrap();
    assert_eq!(next_text(&mut bob).await, operation("still here"));
}

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let (url, room) = start_relay(Arc::new(MemoryStore::new())).await;
    let mut peer = connect(&url).await;
    wait_for_connections(&room, 1).await;

    peer.close(None).await.unwrap();
    wait_for_connections(&room, 0).await;
}

#[tokio::test]
async fn test_snapshots_survive_restart_with_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.db");

    let room = Arc::new(RelayRoom::new(notesync_server::open_store(&path)));
    let peer = room.join();
    peer.handle_payload(snapshot("first\n").into_bytes()).await;
    peer.handle_payload(snapshot("second\n").into_bytes()).await;
    drop(peer);
    drop(room);

    let store = notesync_server::open_store(&path);
    let record = store.get_document().await.unwrap().unwrap();
    assert_eq!(record.content, r#"{"ops":[{"insert":"second\n"}]}"#);
}
