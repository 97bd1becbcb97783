//! WebSocket transport
//!
//! This file implements the accept loop of the relay. Responsibilities:
//! - Accept TCP connections and upgrade the ones aimed at the configured
//!   path (`/ws` by default) to WebSockets
//! - Refuse new upgrades while `max_connections` clients are connected
//! - Create a `Client` for each connection and register it with the hub
//! - Run the read and write pumps until the connection ends
//!
//! Frames are never parsed here: whatever a browser sends is handed to the
//! hub as-is.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_tungstenite::accept_hdr_async_with_config;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::WebSocketConfig;

use crate::client::Client;
use crate::config::Settings;
use crate::hub::HubHandle;
use crate::transport::pumps::{read_pump, write_pump};
use crate::utils::error::Result;
use crate::utils::shutdown::Shutdown;

pub async fn bind(addr: &str) -> Result<TcpListener> {
    Ok(TcpListener::bind(addr).await?)
}

/// Accepts connections until `shutdown` fires. Each connection is served on
/// its own task.
///
/// A connection slot is reserved at accept time and held until the
/// connection ends, so `max_connections` also holds for handshakes that run
/// concurrently.
pub async fn start_websocket_server(
    listener: TcpListener,
    hub: HubHandle,
    settings: Settings,
    shutdown: Shutdown,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(
        "WebSocket server listening on ws://{local_addr}{}",
        settings.server.ws_path
    );

    let slots = Arc::new(Semaphore::new(
        settings.server.max_connections.min(Semaphore::MAX_PERMITS),
    ));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {e}");
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        continue;
                    }
                };

                let slot = slots.clone().try_acquire_owned().ok();
                let hub = hub.clone();
                let settings = settings.clone();
                tokio::spawn(serve_connection(stream, peer, slot, hub, settings));
            }
            _ = shutdown.wait() => {
                info!("WebSocket server stopped accepting connections");
                return Ok(());
            }
        }
    }
}

/// Performs the handshake and runs both pumps for one connection.
///
/// Without a `slot` the handshake is refused with 503. The slot is released
/// when this function returns.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    slot: Option<OwnedSemaphorePermit>,
    hub: HubHandle,
    settings: Settings,
) {
    let ws_path = settings.server.ws_path.clone();
    let at_capacity = slot.is_none();

    let check_request = move |request: &Request,
                              response: Response|
          -> std::result::Result<Response, ErrorResponse> {
        if request.uri().path() != ws_path {
            return Err(error_response(StatusCode::NOT_FOUND, "not found"));
        }
        if at_capacity {
            return Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "too many connections",
            ));
        }
        Ok(response)
    };

    let max_message_size = settings.connection.max_message_size;
    let ws_config = WebSocketConfig::default()
        .max_message_size(Some(max_message_size))
        .max_frame_size(Some(max_message_size));

    let ws_stream = match accept_hdr_async_with_config(stream, check_request, Some(ws_config)).await
    {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%peer, "WebSocket handshake rejected: {e}");
            return;
        }
    };

    let (ws_sender, ws_receiver) = ws_stream.split();
    let (client, queue) = Client::channel(settings.hub.send_queue_capacity);
    let client_id = client.id.clone();
    let lifecycle = client.lifecycle.clone();

    // Register client before doing anything else
    if let Err(e) = hub.register(client) {
        warn!(%client_id, "Could not register client: {e}");
        return;
    }
    lifecycle.mark_connected();
    info!(%client_id, %peer, "Client connected");

    let writer = tokio::spawn(write_pump(
        ws_sender,
        queue,
        hub.clone(),
        client_id.clone(),
        lifecycle.clone(),
        settings.connection.clone(),
    ));

    read_pump(
        ws_receiver,
        hub.clone(),
        client_id.clone(),
        lifecycle.clone(),
        settings.connection.clone(),
    )
    .await;

    if let Err(e) = writer.await {
        warn!(%client_id, "Write pump panicked: {e}");
    }

    lifecycle.mark_closed();
    drop(slot);
    info!(%client_id, "Client disconnected");
}

fn error_response(status: StatusCode, body: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(body.to_string()));
    *response.status_mut() = status;
    response
}
