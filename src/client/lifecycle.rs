//! Connection lifecycle
//!
//! Every connection moves `Connecting -> Connected -> Closing -> Closed` and
//! never goes back. The state lives in a `watch` channel so that whichever
//! party first sees a failure (read pump, write pump, or the hub evicting a
//! slow consumer) can wake the others by entering `Closing`.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientState {
    Connecting,
    Connected,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<ClientState>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ClientState::Connecting);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ClientState {
        *self.tx.borrow()
    }

    pub fn is_closing(&self) -> bool {
        self.state() >= ClientState::Closing
    }

    pub fn mark_connected(&self) {
        self.advance(ClientState::Connected);
    }

    /// Enters `Closing`. Returns `true` only for the caller that actually
    /// made the transition.
    pub fn begin_closing(&self) -> bool {
        self.advance(ClientState::Closing)
    }

    pub fn mark_closed(&self) {
        self.advance(ClientState::Closed);
    }

    /// Resolves once the connection is `Closing` or `Closed`.
    pub async fn closing(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|state| *state >= ClientState::Closing).await;
    }

    fn advance(&self, next: ClientState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state < next {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
