//! Message transports between editor instances

use std::sync::atomic::{AtomicU64, Ordering};

use shared::SyncMessage;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use super::SyncError;

/// Best-effort, unordered delivery to every other participant.
/// A transport never delivers a participant's own messages back to it.
pub trait SyncTransport {
    fn post(&self, message: &SyncMessage) -> Result<(), SyncError>;

    /// Messages received since the last call, without blocking
    fn drain(&mut self) -> Vec<SyncMessage>;

    fn close(&mut self) {}
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: u64,
    /// JSON text, as it would cross a real channel
    payload: String,
}

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// In-process channel shared by several editors (tests, headless runs)
#[derive(Debug, Clone)]
pub struct LocalHub {
    sender: broadcast::Sender<Envelope>,
}

impl LocalHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New participant endpoint
    pub fn connect(&self) -> LocalTransport {
        LocalTransport {
            origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
            sender: self.sender.clone(),
            receiver: Some(self.sender.subscribe()),
        }
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[derive(Debug)]
pub struct LocalTransport {
    origin: u64,
    sender: broadcast::Sender<Envelope>,
    receiver: Option<broadcast::Receiver<Envelope>>,
}

impl SyncTransport for LocalTransport {
    fn post(&self, message: &SyncMessage) -> Result<(), SyncError> {
        if self.receiver.is_none() {
            return Err(SyncError::Closed);
        }
        let payload = serde_json::to_string(message)?;
        // no other subscriber is not an error: nobody is listening yet
        let _ = self.sender.send(Envelope {
            origin: self.origin,
            payload,
        });
        Ok(())
    }

    fn drain(&mut self) -> Vec<SyncMessage> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Vec::new();
        };
        let mut messages = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(envelope) if envelope.origin == self.origin => {}
                Ok(envelope) => match serde_json::from_str(&envelope.payload) {
                    Ok(message) => messages.push(message),
                    Err(e) => warn!("dropping malformed sync message: {e}"),
                },
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "sync receiver lagged; messages lost");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        messages
    }

    fn close(&mut self) {
        self.receiver = None;
    }
}
