//! Upload bridge
//!
//! Turns a stored upload into a `link` broadcast. From the hub's point of
//! view the bridge is just another sender with no connection of its own, so
//! the announcement goes to every connected client.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hub::{Envelope, HubHandle};
use crate::upload::store::{StoredUpload, UploadStore};
use crate::utils::error::Result;

/// Body an upload endpoint sends back to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub error: String,
}

impl UploadResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: String::new(),
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadBridge {
    hub: HubHandle,
    store: UploadStore,
}

impl UploadBridge {
    pub fn new(hub: HubHandle, store: UploadStore) -> Self {
        Self { hub, store }
    }

    /// Broadcasts a `link` envelope for a file that is already stored.
    pub fn announce(&self, sender_id: &str, public_path: &str) -> Result<Envelope> {
        let envelope = Envelope::link(sender_id, public_path);
        self.hub.broadcast_envelope(&envelope)?;
        info!(from = sender_id, path = public_path, "Announced upload");
        Ok(envelope)
    }

    /// Stores the file, then announces it. Nothing is broadcast if the
    /// write fails.
    pub async fn store_and_announce(
        &self,
        sender_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload> {
        let stored = self.store.save(filename, bytes).await?;
        self.announce(sender_id, &stored.public_path)?;
        Ok(stored)
    }
}
