//! Client representation
//!
//! `Client` holds the sending side of a bounded per-client queue used by the
//! hub to push frames, and the `Lifecycle` shared with the connection's
//! pumps. The receiving side is drained by the write pump.

use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::client::lifecycle::Lifecycle;

pub type ClientId = String;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub sender: Sender<WsMessage>,
    pub lifecycle: Lifecycle,
}

impl Client {
    /// Create a new client around an existing queue sender. The `id` is a
    /// UUID used to key the hub's client set and to tag log lines.
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Create a client together with the receiving end of its outbound queue.
    pub fn channel(capacity: usize) -> (Self, Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Non-blocking enqueue. A full or closed queue is reported back so the
    /// hub can evict the client instead of waiting on it.
    pub fn try_enqueue(&self, frame: WsMessage) -> Result<(), TrySendError<WsMessage>> {
        self.sender.try_send(frame)
    }
}
