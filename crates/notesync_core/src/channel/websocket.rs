//! WebSocket client channel (native only).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::MessageChannel;
use crate::error::{Result, SyncError};
use crate::store::BoxFuture;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Client side of the relay connection.
///
/// A background task owns the socket: it writes queued payloads, forwards
/// every received text or binary message to the inbound receiver returned by
/// [`connect`](Self::connect), and pings the relay every 30 seconds.
pub struct WebSocketChannel {
    outgoing: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
}

impl WebSocketChannel {
    /// Connect to the relay at `url`.
    ///
    /// Returns the channel and the receiver inbound payloads are delivered to.
    /// The receiver closes when the connection ends.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Vec<u8>>)> {
        let url = Url::parse(url)
            .map_err(|e| SyncError::Channel(format!("invalid relay url {}: {}", url, e)))?;
        let (mut ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::Channel(format!("failed to connect to {}: {}", url, e)))?;
        log::info!("[WebSocketChannel] Web socket connected: {}", url);

        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let open = Arc::new(AtomicBool::new(true));
        let task_open = Arc::clone(&open);

        tokio::spawn(async move {
            let mut ping = tokio::time::interval(PING_INTERVAL);
            ping.tick().await;

            loop {
                tokio::select! {
                    msg = ws.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if inbound_tx.send(text.as_str().as_bytes().to_vec()).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(data))) => {
                                if inbound_tx.send(data.to_vec()).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                log::info!("[WebSocketChannel] Connection closed by relay");
                                break;
                            }
                            Some(Err(e)) => {
                                log::error!("[WebSocketChannel] Web socket error: {}", e);
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                    outgoing = outgoing_rx.recv() => {
                        let Some(message) = outgoing else { break };
                        let closing = matches!(message, Message::Close(_));
                        if let Err(e) = ws.send(message).await {
                            log::error!("[WebSocketChannel] Failed to send message: {}", e);
                            break;
                        }
                        if closing {
                            break;
                        }
                    }
                    _ = ping.tick() => {
                        if let Err(e) = ws.send(Message::Ping(Vec::new().into())).await {
                            log::warn!("[WebSocketChannel] Failed to send ping: {}", e);
                            break;
                        }
                    }
                }
            }

            task_open.store(false, Ordering::SeqCst);
            log::info!("[WebSocketChannel] Web socket disconnected");
        });

        Ok((
            Self {
                outgoing: outgoing_tx,
                open,
            },
            inbound_rx,
        ))
    }

    /// Whether the connection task is still running.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl MessageChannel for WebSocketChannel {
    fn send(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if !self.is_open() {
                return Err(SyncError::ChannelClosed);
            }
            let message = match String::from_utf8(payload) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => Message::Binary(e.into_bytes().into()),
            };
            self.outgoing
                .send(message)
                .map_err(|_| SyncError::ChannelClosed)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.is_open() {
                let _ = self.outgoing.send(Message::Close(None));
            }
            Ok(())
        })
    }
}
