//! In-process message channel.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use super::{Frame, MessageChannel};
use crate::error::{Result, SyncError};
use crate::store::BoxFuture;

/// Channel whose sends land in an unbounded tokio queue.
///
/// Every delivered payload is also recorded, so tests can inspect what a
/// session put on the wire. Two sessions can be wired together by feeding
/// one channel's receiver into the other session's inbound loop.
#[derive(Debug)]
pub struct MemoryChannel {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    sent: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    failing_sends: AtomicUsize,
}

impl MemoryChannel {
    /// Create a channel and the receiver its sends are delivered to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outgoing, receiver) = mpsc::unbounded_channel();
        let channel = Self {
            outgoing,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            failing_sends: AtomicUsize::new(0),
        };
        (channel, receiver)
    }

    /// Make the next `count` sends fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Raw payloads delivered so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivered payloads decoded as frames. Undecodable payloads are skipped.
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|payload| Frame::decode(payload).ok())
            .collect()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MessageChannel for MemoryChannel {
    fn send(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(SyncError::ChannelClosed);
            }
            let injected = self
                .failing_sends
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if injected.is_ok() {
                return Err(SyncError::Channel("injected send failure".to_string()));
            }

            self.sent.lock().unwrap().push(payload.clone());
            // A dropped receiver just means nobody is listening.
            let _ = self.outgoing.send(payload);
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_and_records() {
        let (channel, mut receiver) = MemoryChannel::new();
        channel.send(b"hello".to_vec()).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), b"hello".to_vec());
        assert_eq!(channel.sent(), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (channel, _receiver) = MemoryChannel::new();
        channel.close().await.unwrap();
        assert!(matches!(
            channel.send(b"x".to_vec()).await,
            Err(SyncError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_injected_send_failure() {
        let (channel, _receiver) = MemoryChannel::new();
        channel.fail_next_sends(1);
        assert!(channel.send(b"a".to_vec()).await.is_err());
        channel.send(b"b".to_vec()).await.unwrap();
        assert_eq!(channel.sent(), vec![b"b".to_vec()]);
    }
}
