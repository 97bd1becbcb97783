//! Per-connection pumps
//!
//! Each connection runs a read pump and a write pump. Either one may detect
//! the end of the connection; it then moves the client's lifecycle to
//! `Closing`, which stops the other pump, and reports the client to the hub.
//! Reporting twice is harmless since unregister is idempotent.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::Receiver;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{ClientId, Lifecycle};
use crate::config::ConnectionSettings;
use crate::hub::HubHandle;
use crate::utils::error::{RelayError, Result};

/// Reads frames until the peer goes away and republishes every text or
/// binary frame to the hub, untouched.
///
/// Any frame, pongs included, resets the `pong_wait` read deadline.
pub async fn read_pump<S>(
    mut stream: S,
    hub: HubHandle,
    client_id: ClientId,
    lifecycle: Lifecycle,
    settings: ConnectionSettings,
) where
    S: Stream<Item = std::result::Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let pong_wait = settings.pong_wait();

    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(pong_wait, stream.next()) => next,
            _ = lifecycle.closing() => break,
        };

        let frame = match next {
            Err(_) => {
                debug!(%client_id, "No frame within pong wait");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(%client_id, error = %e, "Read failed");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            WsMessage::Text(_) | WsMessage::Binary(_) => {
                if hub.broadcast(Some(client_id.clone()), frame).is_err() {
                    break;
                }
            }
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }

    lifecycle.begin_closing();
    let _ = hub.unregister(&client_id);
    debug!(%client_id, "Read pump closed");
}

/// Drains the client's queue onto the socket and keeps the connection alive
/// with periodic pings.
///
/// Stops on the first failed or overdue write, when the hub drops the
/// queue, or when the connection starts closing. Frames still queued at that
/// point are discarded.
pub async fn write_pump<S>(
    mut sink: S,
    mut queue: Receiver<WsMessage>,
    hub: HubHandle,
    client_id: ClientId,
    lifecycle: Lifecycle,
    settings: ConnectionSettings,
) where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let write_wait = settings.write_wait();
    let ping_period = settings.ping_period();
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            queued = queue.recv() => match queued {
                Some(frame) => {
                    if let Err(e) = write_frame(&mut sink, frame, write_wait).await {
                        debug!(%client_id, error = %e, "Write failed");
                        break;
                    }
                }
                None => {
                    // the hub dropped this client
                    close_sink(&mut sink, write_wait).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = write_frame(&mut sink, WsMessage::Ping(Default::default()), write_wait).await {
                    debug!(%client_id, error = %e, "Ping failed");
                    break;
                }
            }
            _ = lifecycle.closing() => {
                close_sink(&mut sink, write_wait).await;
                break;
            }
        }
    }

    lifecycle.begin_closing();
    let _ = hub.unregister(&client_id);
    queue.close();
    debug!(%client_id, "Write pump closed");
}

async fn write_frame<S>(sink: &mut S, frame: WsMessage, write_wait: Duration) -> Result<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    tokio::time::timeout(write_wait, sink.send(frame))
        .await
        .map_err(|_| RelayError::WriteTimeout)??;
    Ok(())
}

/// Best effort: the peer may already be gone.
async fn close_sink<S>(sink: &mut S, write_wait: Duration)
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let _ = tokio::time::timeout(write_wait, sink.send(WsMessage::Close(None))).await;
    let _ = tokio::time::timeout(write_wait, sink.close()).await;
}
