//! Hub engine
//!
//! This module contains the control loop that owns the set of connected
//! clients. Responsibilities:
//! - adding clients on register and dropping them on unregister
//! - fanning every broadcast frame out to the clients registered at the
//!   moment the loop processes it
//! - evicting clients whose outbound queue is full, so one stalled reader
//!   never delays delivery to the rest
//!
//! Concurrency notes:
//! - Only `Hub::run` touches the client set. Everything else talks to it
//!   through the three unbounded channels behind `HubHandle`, so no lock
//!   guards membership.
//! - The loop never awaits a client: queue writes are `try_send`.
//! - `connected_clients` is a gauge written by the loop and read elsewhere
//!   for logging and connection limits. It is never used for membership.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TrySendError};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ClientId};
use crate::config::HubSettings;
use crate::hub::message::Envelope;
use crate::utils::error::{RelayError, Result};
use crate::utils::shutdown::Shutdown;

/// A frame waiting to be fanned out.
///
/// `origin` is the client that sent it, or `None` for frames injected by the
/// server itself (upload announcements).
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub origin: Option<ClientId>,
    pub frame: WsMessage,
}

/// Submission side of the hub. Cheap to clone; one copy per connection.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: UnboundedSender<Client>,
    unregister_tx: UnboundedSender<ClientId>,
    broadcast_tx: UnboundedSender<Broadcast>,
    connected: Arc<AtomicUsize>,
}

impl HubHandle {
    pub fn register(&self, client: Client) -> Result<()> {
        self.register_tx
            .send(client)
            .map_err(|_| RelayError::HubClosed)
    }

    /// Removing a client that is not registered is a no-op in the loop, so
    /// both pumps may report the same disconnect.
    pub fn unregister(&self, client_id: &ClientId) -> Result<()> {
        self.unregister_tx
            .send(client_id.clone())
            .map_err(|_| RelayError::HubClosed)
    }

    /// Queues a raw frame for every registered client.
    pub fn broadcast(&self, origin: Option<ClientId>, frame: WsMessage) -> Result<()> {
        self.broadcast_tx
            .send(Broadcast { origin, frame })
            .map_err(|_| RelayError::HubClosed)
    }

    /// Serializes `envelope` once and broadcasts it without an origin.
    pub fn broadcast_envelope(&self, envelope: &Envelope) -> Result<()> {
        self.broadcast(None, envelope.to_frame()?)
    }

    pub fn connected_clients(&self) -> usize {
        self.connected.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct Hub {
    pub(crate) clients: HashMap<ClientId, Client>,
    echo_to_sender: bool,
    register_rx: UnboundedReceiver<Client>,
    unregister_rx: UnboundedReceiver<ClientId>,
    broadcast_rx: UnboundedReceiver<Broadcast>,
    connected: Arc<AtomicUsize>,
}

impl Hub {
    pub fn new(settings: &HubSettings) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicUsize::new(0));

        let hub = Self {
            clients: HashMap::new(),
            echo_to_sender: settings.echo_to_sender,
            register_rx,
            unregister_rx,
            broadcast_rx,
            connected: connected.clone(),
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            connected,
        };
        (hub, handle)
    }

    /// Runs the control loop until `shutdown` fires or every handle is
    /// dropped. On exit all remaining clients are closed.
    pub async fn run(mut self, shutdown: Shutdown) {
        info!("Hub started");

        // no `biased;`: ready branches are picked in random order
        loop {
            tokio::select! {
                client = self.register_rx.recv() => match client {
                    Some(client) => self.register(client),
                    None => break,
                },
                client_id = self.unregister_rx.recv() => match client_id {
                    Some(client_id) => self.unregister(&client_id),
                    None => break,
                },
                broadcast = self.broadcast_rx.recv() => match broadcast {
                    Some(broadcast) => self.broadcast(broadcast),
                    None => break,
                },
                _ = shutdown.wait() => {
                    info!("Shutdown signal received by hub");
                    break;
                }
            }
        }

        self.close_all();
        info!("Hub stopped");
    }

    pub fn register(&mut self, client: Client) {
        debug!(client_id = %client.id, "Registered client");
        self.clients.insert(client.id.clone(), client);
        self.publish_count();
    }

    pub fn unregister(&mut self, client_id: &ClientId) {
        if let Some(client) = self.clients.remove(client_id) {
            client.lifecycle.begin_closing();
            debug!(%client_id, "Unregistered client");
            self.publish_count();
        }
    }

    /// Fans `broadcast` out to the current client set. Clients whose queue
    /// is full or already closed are evicted.
    pub fn broadcast(&mut self, broadcast: Broadcast) {
        let mut evicted = Vec::new();

        for (client_id, client) in &self.clients {
            if !self.echo_to_sender && broadcast.origin.as_ref() == Some(client_id) {
                continue;
            }

            match client.try_enqueue(broadcast.frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(%client_id, "Send queue full, dropping slow client");
                    evicted.push(client_id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%client_id, "Send queue closed, dropping client");
                    evicted.push(client_id.clone());
                }
            }
        }

        for client_id in evicted {
            self.unregister(&client_id);
        }
    }

    fn close_all(&mut self) {
        for (_, client) in self.clients.drain() {
            client.lifecycle.begin_closing();
        }
        self.publish_count();
    }

    fn publish_count(&self) {
        self.connected.store(self.clients.len(), Ordering::Release);
    }
}
